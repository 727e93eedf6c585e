//! `hostprep deploy`: clone or update the application and restart it.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::deploy as service;
use crate::infra::fs::LocalFs;

/// Run `hostprep deploy`.
///
/// Exits with status 1 when the deployment failed.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let cfg = app.load_config()?;
    let _log_guard = app.init_file_logging(&cfg)?;

    let reporter = app.terminal_reporter();
    let report = service::deploy(&cfg, &app.runner, &LocalFs, &reporter).await?;
    drop(reporter);

    app.renderer().render_report("Deployment", &report)?;
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
