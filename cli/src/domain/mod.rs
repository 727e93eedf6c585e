//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod deploy;
pub mod deploy_key;
pub mod envfile;
pub mod error;
pub mod launcher;
pub mod ssh;
pub mod step;
pub mod template;

pub use config::{ConfigFile, InstanceCount, ProvisionConfig, parse_env_lines};
pub use deploy_key::{DeployKeyEvent, DeployKeyState};
pub use error::{ConfigError, DeployKeyError, EnvFileError, LaunchError, ProvisionError, TemplateError};
pub use step::{CommandOutcome, ProvisionReport, Step, StepOutcome, StepRecord};
