//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::step::{ProvisionReport, StepOutcome};
use crate::output::OutputContext;

/// Renders reports as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("hostprep {version}");
    }

    /// Render the per-step summary of a run.
    ///
    /// Failures are printed even when `quiet`; they go to stderr.
    pub fn render_report(&self, title: &str, report: &ProvisionReport) {
        let failed = report.failures().count();
        if !self.ctx.quiet {
            println!();
            self.ctx.header(title);
            for record in &report.steps {
                let id = format!("{:<16}", record.step.id());
                let (marker, style) = self.ctx.styles.outcome(&record.outcome);
                let marker = marker.style(style);
                match &record.outcome {
                    StepOutcome::Succeeded => println!("  {marker} {id}"),
                    StepOutcome::Skipped { reason } => {
                        println!("  {marker} {id} {}", reason.style(self.ctx.styles.dim));
                    }
                    StepOutcome::Failed { reason } => println!("  {marker} {id} {reason}"),
                }
            }
            if let Some(state) = report.deploy_key {
                println!();
                self.ctx.kv("Deploy key:", &state.to_string());
            }
            println!();
        }
        if failed == 0 {
            self.ctx.success("Completed without failures");
        } else {
            self.ctx.error(&format!(
                "{failed} step(s) failed. Fix the cause and re-run; completed steps are safe to repeat."
            ));
        }
    }
}
