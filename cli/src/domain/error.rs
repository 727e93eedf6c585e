//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while loading or validating the configuration set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("repo_url is required. Set it in the config file (see 'hostprep render --help').")]
    MissingRepoUrl,

    #[error("instances must be a positive number or 'max' (got '{0}')")]
    InvalidInstances(String),

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{field} must be an absolute path (got '{}')", .path.display())]
    RelativePath { field: &'static str, path: PathBuf },

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid line {line} in {source_name}: {content}")]
    InvalidEnvLine {
        source_name: String,
        line: usize,
        content: String,
    },
}

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Precondition failures that abort provisioning before any side effect.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("hostprep provision must run as root.\n\nRe-run with: sudo hostprep provision")]
    NotPrivileged,

    #[error("Unknown step '{id}'.\n\nValid steps: {valid}")]
    UnknownStep { id: String, valid: String },
}

// ── Template errors ───────────────────────────────────────────────────────────

/// Errors produced while rendering generated artifacts.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template field '{0}' is required but empty")]
    MissingField(&'static str),

    #[error("template field '{field}' contains a character that is not allowed in a shell string: {value:?}")]
    UnsafeValue { field: &'static str, value: String },

    #[error("rendering {name}: {message}")]
    Render { name: &'static str, message: String },
}

// ── Environment file errors ───────────────────────────────────────────────────

/// Errors produced while rendering the environment file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvFileError {
    #[error("invalid environment key '{0}': must match ^[A-Za-z_][A-Za-z0-9_]*$")]
    InvalidKey(String),

    #[error("value for '{0}' spans multiple lines")]
    MultilineValue(String),
}

// ── Deploy key errors ─────────────────────────────────────────────────────────

/// Errors raised by the deploy-key state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeployKeyError {
    #[error("deploy key cannot go from {from} on '{event}'")]
    InvalidTransition { from: String, event: String },
}

// ── Launcher errors ───────────────────────────────────────────────────────────

/// Errors raised by the remote launcher before anything leaves the machine.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Cannot find {} to copy.", .0.display())]
    PayloadNotFound(PathBuf),

    #[error("Remote host is required.")]
    MissingHost,

    #[error(
        "env_source {} cannot be copied to the remote host. Use a file name that sits next to the config file.",
        .0.display()
    )]
    EnvSourceNotPortable(PathBuf),

    #[error("Invalid key selector '{0}'")]
    InvalidKeySelector(String),
}
