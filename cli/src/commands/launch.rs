//! `hostprep launch`: copy hostprep to a remote host and provision it there.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::launch::{self as service, LaunchRequest};
use crate::infra::config::{self as config_loader, ConfigSource};
use crate::infra::fs::LocalFs;
use crate::infra::prompt::DialoguerPrompt;

/// Arguments for the launch command.
#[derive(Args, Default)]
pub struct LaunchArgs {
    /// Remote host name or address (asked when omitted)
    #[arg(long)]
    pub host: Option<String>,

    /// Remote login user (asked when omitted, default: ubuntu)
    #[arg(long)]
    pub user: Option<String>,

    /// SSH key: 0 for ~/.ssh/id_rsa, n for ~/.ssh/id_rsa_n, or a path
    #[arg(long)]
    pub key: Option<String>,

    /// File to copy and run remotely (default: this executable)
    #[arg(long)]
    pub payload: Option<PathBuf>,
}

/// Run `hostprep launch`. The remote exit status becomes the exit code.
///
/// # Errors
///
/// Returns an error if the payload or config file is missing locally, the
/// answers are invalid, or `scp`/`ssh` cannot be started.
pub async fn run(args: &LaunchArgs, app: &AppContext) -> Result<ExitCode> {
    app.init_stderr_logging()?;

    let payload = match &args.payload {
        Some(path) => path.clone(),
        None => std::env::current_exe().context("locating the hostprep executable")?,
    };
    let config = match &app.config_source {
        ConfigSource::Explicit(path) => Some(path.clone()),
        ConfigSource::Default(_) => None,
    };
    // A missing config is reported by the launch itself, with the payload.
    let env_source = match &config {
        Some(path) if path.exists() => {
            config_loader::load_file(&ConfigSource::Explicit(path.clone()))?.env_source
        }
        _ => None,
    };
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;

    let request = LaunchRequest {
        host: args.host.clone(),
        user: args.user.clone(),
        key: args.key.clone(),
        payload,
        config,
        env_source,
        home,
    };
    let reporter = app.terminal_reporter();
    let code = service::launch(&request, &app.runner, &LocalFs, &DialoguerPrompt, &reporter).await?;
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
