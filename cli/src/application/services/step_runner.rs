//! Best-effort command execution for one pipeline step.
//!
//! Every command gets two log records (start and result). A failing command
//! is recorded, never propagated: the step ends as `Failed` and the caller
//! moves on to the next step.

use tracing::{error, info, warn};

use crate::application::ports::CommandRunner;
use crate::domain::step::{CommandOutcome, Step, StepOutcome, StepRecord};

/// Accumulates the commands, warnings and first failure of a step.
pub struct StepRunner<'a, R: CommandRunner> {
    runner: &'a R,
    step: Step,
    commands: Vec<CommandOutcome>,
    warnings: Vec<String>,
    failure: Option<String>,
}

impl<'a, R: CommandRunner> StepRunner<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R, step: Step) -> Self {
        info!(step = %step, "step started");
        Self {
            runner,
            step,
            commands: Vec::new(),
            warnings: Vec::new(),
            failure: None,
        }
    }

    /// Run a command; a non-zero exit marks the step as failed.
    ///
    /// Returns `true` on a zero exit status.
    pub async fn run(&mut self, program: &str, args: &[&str]) -> bool {
        let outcome = execute(self.runner, program, args).await;
        let ok = outcome.success();
        if !ok && self.failure.is_none() {
            self.failure = Some(match outcome.code {
                Some(code) => format!("`{}` exited with {code}", outcome.command),
                None => format!("`{}` could not be run", outcome.command),
            });
        }
        self.commands.push(outcome);
        ok
    }

    /// Run a command whose failure is expected and does not fail the step.
    pub async fn run_tolerant(&mut self, program: &str, args: &[&str]) -> bool {
        let outcome = execute(self.runner, program, args).await;
        let ok = outcome.success();
        self.commands.push(outcome);
        ok
    }

    /// Record a non-fatal observation.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(step = %self.step, "{message}");
        self.warnings.push(message);
    }

    /// Mark the step as failed for a reason that is not a command exit code.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(step = %self.step, "{reason}");
        if self.failure.is_none() {
            self.failure = Some(reason);
        }
    }

    /// `true` once any failure has been recorded.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Close the step as succeeded or failed.
    #[must_use]
    pub fn finish(mut self) -> StepRecord {
        let outcome = match self.failure.take() {
            Some(reason) => StepOutcome::Failed { reason },
            None => StepOutcome::Succeeded,
        };
        self.into_record(outcome)
    }

    /// Close the step as skipped, unless something already failed.
    #[must_use]
    pub fn skip(self, reason: impl Into<String>) -> StepRecord {
        let outcome = match &self.failure {
            Some(reason) => StepOutcome::failed(reason.clone()),
            None => StepOutcome::skipped(reason),
        };
        self.into_record(outcome)
    }

    fn into_record(self, outcome: StepOutcome) -> StepRecord {
        match &outcome {
            StepOutcome::Succeeded => info!(step = %self.step, "step succeeded"),
            StepOutcome::Skipped { reason } => info!(step = %self.step, %reason, "step skipped"),
            StepOutcome::Failed { reason } => warn!(step = %self.step, %reason, "step failed"),
        }
        StepRecord {
            step: self.step,
            outcome,
            commands: self.commands,
            warnings: self.warnings,
        }
    }
}

/// Run one command and log its start and result.
pub async fn execute(runner: &impl CommandRunner, program: &str, args: &[&str]) -> CommandOutcome {
    let command = command_line(program, args);
    info!(%command, "running");
    match runner.run(program, args).await {
        Ok(output) => {
            let code = output.status.code();
            if output.status.success() {
                info!(%command, code = 0, "command succeeded");
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
                warn!(%command, ?code, stderr = %last, "command failed");
            }
            CommandOutcome { command, code }
        }
        Err(e) => {
            error!(%command, error = %format!("{e:#}"), "command could not be run");
            CommandOutcome { command, code: None }
        }
    }
}

/// Join a program and its arguments for logs; empty arguments are shown as `""`.
#[must_use]
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(|a| if a.is_empty() { "\"\"" } else { *a }))
        .collect::<Vec<_>>()
        .join(" ")
}
