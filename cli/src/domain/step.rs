//! Provisioning steps and the per-step report.
//!
//! Steps run in the fixed order of [`Step::ALL`]. A failed step never stops
//! the pipeline; its outcome is recorded so the caller decides what overall
//! success means.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::deploy_key::DeployKeyState;
use crate::domain::error::ProvisionError;

/// One provisioning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Packages,
    ProxyCache,
    AppAccount,
    Supervisor,
    AuthorizedKeys,
    CacheConfig,
    EnvFile,
    DeployScript,
    DeployKey,
    Deploy,
    Cleanup,
}

impl Step {
    /// Every step, in execution order.
    pub const ALL: [Step; 11] = [
        Step::Packages,
        Step::ProxyCache,
        Step::AppAccount,
        Step::Supervisor,
        Step::AuthorizedKeys,
        Step::CacheConfig,
        Step::EnvFile,
        Step::DeployScript,
        Step::DeployKey,
        Step::Deploy,
        Step::Cleanup,
    ];

    /// Identifier used by `--only` / `--skip`.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Packages => "packages",
            Self::ProxyCache => "proxy-cache",
            Self::AppAccount => "app-account",
            Self::Supervisor => "supervisor",
            Self::AuthorizedKeys => "authorized-keys",
            Self::CacheConfig => "cache-config",
            Self::EnvFile => "env-file",
            Self::DeployScript => "deploy-script",
            Self::DeployKey => "deploy-key",
            Self::Deploy => "deploy",
            Self::Cleanup => "cleanup",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Packages => "Installing runtime packages",
            Self::ProxyCache => "Installing reverse proxy and cache",
            Self::AppAccount => "Creating application account",
            Self::Supervisor => "Installing process supervisor",
            Self::AuthorizedKeys => "Propagating authorized keys",
            Self::CacheConfig => "Configuring cache daemon",
            Self::EnvFile => "Writing environment file",
            Self::DeployScript => "Writing deploy script",
            Self::DeployKey => "Preparing deploy key",
            Self::Deploy => "Running deploy script",
            Self::Cleanup => "Cleaning up",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Step {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.id() == s)
            .ok_or_else(|| ProvisionError::UnknownStep {
                id: s.to_string(),
                valid: Step::ALL.map(Step::id).join(", "),
            })
    }
}

/// Compute the steps to run from `--only` and `--skip` selections.
///
/// An empty `only` means every step. Order is always [`Step::ALL`] order.
#[must_use]
pub fn select_steps(only: &[Step], skip: &[Step]) -> Vec<Step> {
    Step::ALL
        .into_iter()
        .filter(|s| only.is_empty() || only.contains(s))
        .filter(|s| !skip.contains(s))
        .collect()
}

// ── Outcomes ─────────────────────────────────────────────────────────────────

/// Result of a single executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    /// The command line as logged.
    pub command: String,
    /// Exit code, `None` if the process could not be spawned or was killed.
    pub code: Option<i32>,
}

impl CommandOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StepOutcome {
    Succeeded,
    Skipped { reason: String },
    Failed { reason: String },
}

impl StepOutcome {
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome of one step together with the commands it ran.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: Step,
    #[serde(flatten)]
    pub outcome: StepOutcome,
    pub commands: Vec<CommandOutcome>,
    /// Non-fatal observations (e.g. "account already exists").
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Ordered outcome of a provisioning (or deploy) run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepRecord>,
    /// Deploy key state at the end of the run, when the pipeline tracked it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_key: Option<DeployKeyState>,
}

impl ProvisionReport {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            steps: Vec::new(),
            deploy_key: None,
        }
    }

    pub fn push(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.finished_at = Some(at);
    }

    /// `true` when no step failed. Skipped steps count as success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.steps.iter().any(|r| r.outcome.is_failure())
    }

    /// Records of failed steps, in order.
    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|r| r.outcome.is_failure())
    }

    /// Find the record of a step, if it ran.
    #[must_use]
    pub fn get(&self, step: Step) -> Option<&StepRecord> {
        self.steps.iter().find(|r| r.step == step)
    }
}
