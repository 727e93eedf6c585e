//! Environment file rendering.
//!
//! The environment file is a flat list of `KEY=VALUE` lines read by the
//! application process. It is regenerated on every provisioning run.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::EnvFileError;

/// Permission mode of the environment file: owner read/write only.
pub const ENV_FILE_MODE: u32 = 0o600;

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Returns `true` if `key` is a valid environment variable name.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    KEY_PATTERN.is_match(key)
}

/// Render the environment file body.
///
/// # Errors
///
/// Returns an [`EnvFileError`] for an invalid key or a multi-line value.
pub fn render_env_file(entries: &BTreeMap<String, String>) -> Result<String, EnvFileError> {
    let mut out = String::new();
    for (key, value) in entries {
        if !is_valid_key(key) {
            return Err(EnvFileError::InvalidKey(key.clone()));
        }
        if value.contains('\n') || value.contains('\r') {
            return Err(EnvFileError::MultilineValue(key.clone()));
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    Ok(out)
}
