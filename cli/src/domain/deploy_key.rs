//! Deploy-key lifecycle.
//!
//! ```text
//! Absent ──Generate──▶ Generated ──RegistrationConfirmed──▶ RegisteredPending ──CloneSucceeded──▶ InUse
//! ```
//!
//! A provisioning re-run observes the key file and the cloned repository to
//! reconstruct the state; any state other than `Absent` means the key step is
//! a no-op.

use std::fmt;

use serde::Serialize;

use crate::domain::error::DeployKeyError;

/// Where the deploy key is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployKeyState {
    Absent,
    Generated,
    RegisteredPending,
    InUse,
}

/// Inputs that move the deploy key between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployKeyEvent {
    /// `ssh-keygen` produced a key pair.
    Generate,
    /// The operator confirmed the public key is registered with the git host.
    RegistrationConfirmed,
    /// A clone authenticated with the key succeeded.
    CloneSucceeded,
}

impl DeployKeyState {
    /// Reconstruct the state from what is on disk.
    #[must_use]
    pub fn observe(key_present: bool, repo_cloned: bool) -> Self {
        match (key_present, repo_cloned) {
            (false, _) => Self::Absent,
            (true, true) => Self::InUse,
            (true, false) => Self::Generated,
        }
    }

    /// Apply an event.
    ///
    /// # Errors
    ///
    /// Returns [`DeployKeyError::InvalidTransition`] when the event does not
    /// apply to the current state.
    pub fn apply(self, event: DeployKeyEvent) -> Result<Self, DeployKeyError> {
        match (self, event) {
            (Self::Absent, DeployKeyEvent::Generate) => Ok(Self::Generated),
            (Self::Generated, DeployKeyEvent::RegistrationConfirmed) => Ok(Self::RegisteredPending),
            (Self::RegisteredPending, DeployKeyEvent::CloneSucceeded) => Ok(Self::InUse),
            (from, event) => Err(DeployKeyError::InvalidTransition {
                from: from.to_string(),
                event: format!("{event:?}"),
            }),
        }
    }

    /// `true` when the key step has nothing to do.
    #[must_use]
    pub fn needs_generation(self) -> bool {
        self == Self::Absent
    }
}

impl fmt::Display for DeployKeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::Generated => "generated",
            Self::RegisteredPending => "registered-pending",
            Self::InUse => "in-use",
        })
    }
}
