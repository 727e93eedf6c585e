//! JSON output helpers.
//!
//! Every `--json` code path prints one pretty-printed object to stdout: the
//! report on success, or the error object from [`format_error`] on failure.

use anyhow::{Context, Result};

use crate::domain::step::ProvisionReport;

/// Renders reports as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Print a report.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_report(report: &ProvisionReport) -> Result<()> {
        let out = serde_json::to_string_pretty(report).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }

    /// Print the CLI version.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        let out = serde_json::to_string_pretty(&serde_json::json!({ "version": version }))
            .context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
