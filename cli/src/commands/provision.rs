//! `hostprep provision`: bring this host to a running-application state.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{CommandRunner, PrivilegeProbe};
use crate::application::services::provision::{self as service, ProvisionOptions};
use crate::domain::error::ProvisionError;
use crate::domain::step::{ProvisionReport, Step, select_steps};
use crate::infra::fs::LocalFs;
use crate::infra::privilege::IdProbe;

/// Exit code when `--strict` is set and a step failed.
pub const STRICT_FAILURE_CODE: u8 = 2;

/// Arguments for the provision command.
#[derive(Args, Default)]
pub struct ProvisionArgs {
    /// Exit with status 2 when any step fails
    #[arg(long)]
    pub strict: bool,

    /// Run only this step (repeatable)
    #[arg(long, value_name = "STEP")]
    pub only: Vec<Step>,

    /// Skip this step (repeatable)
    #[arg(long, value_name = "STEP")]
    pub skip: Vec<Step>,
}

/// Run `hostprep provision`.
///
/// # Errors
///
/// Returns an error if the process is not running as root or the
/// configuration is invalid. Step failures are reported, not returned.
pub async fn run(args: &ProvisionArgs, app: &AppContext) -> Result<ExitCode> {
    // Nothing, not even the log file, is touched before this check.
    let probe = IdProbe::new(&app.runner);
    if !probe.is_privileged().await? {
        return Err(ProvisionError::NotPrivileged.into());
    }

    let cfg = app.load_config()?;
    let _log_guard = app.init_file_logging(&cfg)?;

    let steps = select_steps(&args.only, &args.skip);
    let hostname = hostname(&app.runner).await;
    let reporter = app.terminal_reporter();
    let report = service::provision(
        &cfg,
        &app.runner,
        &LocalFs,
        &probe,
        &app.registration_gate(),
        &reporter,
        &ProvisionOptions {
            steps: &steps,
            hostname: &hostname,
        },
    )
    .await?;
    drop(reporter);

    app.renderer().render_report("Provisioning", &report)?;
    Ok(ExitCode::from(exit_code(&report, args.strict)))
}

/// Step failures only change the exit status under `--strict`.
#[must_use]
pub fn exit_code(report: &ProvisionReport, strict: bool) -> u8 {
    if strict && !report.is_success() {
        STRICT_FAILURE_CODE
    } else {
        0
    }
}

async fn hostname(runner: &impl CommandRunner) -> String {
    match runner.run("hostname", &[]).await {
        Ok(out) if out.status.success() => {
            let name = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if name.is_empty() { "localhost".to_string() } else { name }
        }
        _ => "localhost".to_string(),
    }
}
