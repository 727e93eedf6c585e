//! `hostprep render`: print a generated artifact without touching the host.

use std::process::ExitCode;

use anyhow::Result;
use clap::ValueEnum;

use crate::app::AppContext;
use crate::domain::envfile::render_env_file;
use crate::domain::template::{
    CacheParams, DeployScriptParams, render_cache_options, render_cache_vcl, render_deploy_script,
};

/// Artifacts `hostprep render` can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Artifact {
    /// The deployment script written to the app account's home
    DeployScript,
    /// The environment file consumed by the application
    EnvFile,
    /// The cache daemon startup options
    CacheOptions,
    /// The cache backend definition
    CacheVcl,
}

/// Run `hostprep render <artifact>`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or rendering fails.
pub fn run(artifact: Artifact, app: &AppContext) -> Result<ExitCode> {
    app.init_stderr_logging()?;
    let cfg = app.load_config()?;
    let rendered = match artifact {
        Artifact::DeployScript => render_deploy_script(&DeployScriptParams::from_config(&cfg))?,
        Artifact::EnvFile => render_env_file(&cfg.environment)?,
        Artifact::CacheOptions => render_cache_options(&CacheParams::from_config(&cfg))?,
        Artifact::CacheVcl => render_cache_vcl(&CacheParams::from_config(&cfg))?,
    };
    print!("{rendered}");
    Ok(ExitCode::SUCCESS)
}
