//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

use crate::domain::step::StepOutcome;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// Completed steps and final success lines (green)
    pub success: Style,
    /// Warnings and non-fatal step failures (yellow)
    pub warning: Style,
    /// Failed steps and fatal errors (red)
    pub error: Style,
    /// In-progress step lines (blue)
    pub info: Style,
    /// Skipped steps and secondary text
    pub dim: Style,
    /// Report titles
    pub header: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold().cyan();
    }

    /// Marker and style for a step outcome in the summary.
    #[must_use]
    pub fn outcome(&self, outcome: &StepOutcome) -> (&'static str, Style) {
        match outcome {
            StepOutcome::Succeeded => ("✓", self.success),
            StepOutcome::Skipped { .. } => ("-", self.dim),
            StepOutcome::Failed { .. } => ("✗", self.error),
        }
    }
}
