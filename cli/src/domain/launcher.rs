//! Remote launcher: key-file resolution and remote command construction.

use std::path::{Path, PathBuf};

use crate::domain::error::LaunchError;

/// Base name of the private key when no selector is given.
pub const DEFAULT_KEY_BASE: &str = "id_rsa";

/// Directory the payload is copied to on the remote host.
pub const REMOTE_DIR: &str = "/tmp";

/// Resolve the private-key file from the operator's selector.
///
/// - empty or `0` → `<ssh_dir>/<base>`
/// - a positive number `n` → `<ssh_dir>/<base>_<n>`
/// - a value starting with `~` or containing `/` → that path, with `~`
///   expanded to `home`
///
/// # Errors
///
/// Returns [`LaunchError::InvalidKeySelector`] for any other value.
pub fn resolve_key_path(
    home: &Path,
    ssh_dir: &Path,
    base: &str,
    selector: &str,
) -> Result<PathBuf, LaunchError> {
    let selector = selector.trim();
    if selector.is_empty() || selector == "0" {
        return Ok(ssh_dir.join(base));
    }
    if let Some(rest) = selector.strip_prefix('~') {
        return Ok(home.join(rest.trim_start_matches('/')));
    }
    if selector.contains('/') {
        return Ok(PathBuf::from(selector));
    }
    match selector.parse::<u32>() {
        Ok(n) => Ok(ssh_dir.join(format!("{base}_{n}"))),
        Err(_) => Err(LaunchError::InvalidKeySelector(selector.to_string())),
    }
}

/// Answers collected from the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub host: String,
    pub user: String,
    pub key: PathBuf,
}

impl LaunchTarget {
    /// `user@host`.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Arguments for `scp` copying `files` into [`REMOTE_DIR`].
#[must_use]
pub fn scp_args(target: &LaunchTarget, files: &[&Path]) -> Vec<String> {
    let mut args = vec!["-i".to_string(), target.key.display().to_string()];
    args.extend(files.iter().map(|f| f.display().to_string()));
    args.push(format!("{}:{REMOTE_DIR}/", target.destination()));
    args
}

/// Arguments for `ssh` running the copied provisioner under `sudo`.
///
/// `-t` allocates a terminal so the deploy-key confirmation can be answered.
#[must_use]
pub fn ssh_args(target: &LaunchTarget, payload_name: &str, config_name: Option<&str>) -> Vec<String> {
    let payload = shell_quote(&format!("{REMOTE_DIR}/{payload_name}"));
    let remote = match config_name {
        Some(config) => {
            let config = shell_quote(&format!("{REMOTE_DIR}/{config}"));
            format!("sudo {payload} provision --config {config}")
        }
        None => format!("sudo {payload} provision"),
    };
    vec![
        "-t".to_string(),
        "-i".to_string(),
        target.key.display().to_string(),
        target.destination(),
        remote,
    ]
}

/// Quote `word` for the remote login shell. Plain paths pass unchanged.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ':' | '@' | '='));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
