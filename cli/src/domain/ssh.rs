//! SSH client configuration for the application account.

use std::path::Path;

use anyhow::Result;

/// Permission mode for files under `~/.ssh`.
pub const SSH_FILE_MODE: u32 = 0o600;

/// Validates that `key` is an ed25519 public key with non-empty key material.
///
/// Accepts the `.pub` file format: `ssh-ed25519 <base64-material> [comment]`.
///
/// # Errors
///
/// Returns an error if the key does not start with `ssh-ed25519 ` or has no
/// key material after the prefix.
pub fn validate_public_key(key: &str) -> Result<()> {
    let material = key
        .trim()
        .strip_prefix("ssh-ed25519 ")
        .ok_or_else(|| anyhow::anyhow!("deploy key must be an ed25519 key (got: {key:?})"))?;
    anyhow::ensure!(!material.trim().is_empty(), "deploy key has no key material");
    Ok(())
}

/// `~/.ssh/config` for the app account: pin the deploy key to the git host
/// and accept its host key on first connection so the first clone does not
/// stop at an interactive prompt.
#[must_use]
pub fn render_client_config(git_host: &str, identity_file: &Path) -> String {
    format!(
        "# Generated by hostprep provision.\n\
         Host {git_host}\n\
         \x20   HostName {git_host}\n\
         \x20   User git\n\
         \x20   IdentityFile {}\n\
         \x20   IdentitiesOnly yes\n\
         \x20   StrictHostKeyChecking accept-new\n",
        identity_file.display()
    )
}

/// Comment embedded in the generated key so operators can recognise it on
/// the git host.
#[must_use]
pub fn key_comment(app_user: &str, hostname: &str) -> String {
    format!("{app_user}@{hostname} (hostprep deploy key)")
}
