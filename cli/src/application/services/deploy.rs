//! Application service: deployment use-case.
//!
//! Executes a [`DeployPlan`] natively: the same procedure the generated deploy
//! script performs, with each command logged and recorded in a report.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::application::ports::{CommandRunner, HostFs, ProgressReporter};
use crate::application::services::step_runner::execute;
use crate::domain::config::ProvisionConfig;
use crate::domain::deploy::{Checkout, DeployAction, DeployPlan};
use crate::domain::step::{ProvisionReport, Step, StepOutcome, StepRecord};

/// Deploy (or update) the application from its repository.
///
/// Failed commands are recorded; only the checkout and the process start
/// abort the remaining plan.
///
/// # Errors
///
/// This function currently never returns an error: every failure is reported
/// in the returned [`ProvisionReport`]. The `Result` keeps the signature in
/// line with the other use-cases.
pub async fn deploy(
    cfg: &ProvisionConfig,
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    reporter: &impl ProgressReporter,
) -> Result<ProvisionReport> {
    let repo_present = fs.exists(&cfg.repo_dir.join(".git"));
    let plan = DeployPlan::new(cfg, repo_present);
    match plan.checkout {
        Checkout::Clone => reporter.step(&format!("Cloning {} ({})", cfg.repo_url, cfg.branch)),
        Checkout::Update => reporter.step(&format!("Updating {} to {}", cfg.repo_dir.display(), cfg.branch)),
    }

    let mut report = ProvisionReport::new(Utc::now());
    let mut record = StepRecord {
        step: Step::Deploy,
        outcome: StepOutcome::Succeeded,
        commands: Vec::new(),
        warnings: Vec::new(),
    };

    for action in &plan.actions {
        match action {
            DeployAction::Run(cmd) => {
                let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
                let outcome = execute(runner, &cmd.program, &args).await;
                let ok = outcome.success();
                let command = outcome.command.clone();
                record.commands.push(outcome);
                if ok || cmd.ignore_failure {
                    continue;
                }
                if !record.outcome.is_failure() {
                    record.outcome = StepOutcome::failed(format!("`{command}` failed"));
                }
                if cmd.abort_on_failure {
                    warn!(%command, "deployment aborted");
                    break;
                }
            }
            DeployAction::LinkEnvFile { target, link } => {
                if let Err(e) = fs.symlink(target, link) {
                    let message = format!("linking {}: {e:#}", link.display());
                    warn!("{message}");
                    record.warnings.push(message);
                }
            }
        }
    }

    match &record.outcome {
        StepOutcome::Failed { reason } => reporter.warn(&format!("Deployment failed: {reason}")),
        _ => {
            info!(process = %cfg.process_name, "deployment finished");
            reporter.success(&format!("Deployed {} as {}", cfg.branch, cfg.process_name));
        }
    }
    report.push(record);
    report.finish(Utc::now());
    Ok(report)
}
