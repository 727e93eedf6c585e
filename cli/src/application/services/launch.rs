//! Application service: remote launch use-case.
//!
//! Copies the provisioner (and optionally its config file and the variable
//! file it sources) to a remote host and runs it there under `sudo`. The
//! remote exit status becomes ours.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::application::ports::{CommandRunner, HostFs, LauncherPrompt, ProgressReporter};
use crate::domain::config::DEFAULT_ADMIN_USER;
use crate::domain::error::LaunchError;
use crate::domain::launcher::{
    DEFAULT_KEY_BASE, LaunchTarget, resolve_key_path, scp_args, ssh_args,
};

/// Inputs to a launch. Answers left as `None` are asked interactively.
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub host: Option<String>,
    pub user: Option<String>,
    pub key: Option<String>,
    /// Local file to copy and execute remotely.
    pub payload: PathBuf,
    /// Config file to copy alongside the payload.
    pub config: Option<PathBuf>,
    /// `env_source` as written in that config file.
    pub env_source: Option<PathBuf>,
    /// Operator's home directory, for key resolution.
    pub home: PathBuf,
}

/// Launch provisioning on a remote host.
///
/// Returns the exit code of the remote run (or of `scp` when the copy fails).
///
/// # Errors
///
/// Returns [`LaunchError`] when the payload, config or sourced variable file
/// is missing locally, the variable file cannot land next to the config on
/// the remote host, no host is given, or the key selector is malformed. Returns an error when
/// `scp` or `ssh` cannot be spawned.
pub async fn launch(
    request: &LaunchRequest,
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    prompt: &impl LauncherPrompt,
    reporter: &impl ProgressReporter,
) -> Result<i32> {
    let env_file = env_source_file(request)?;
    let mut files: Vec<&Path> = vec![request.payload.as_path()];
    files.extend(request.config.as_deref());
    files.extend(env_file.as_deref());
    for file in &files {
        if !fs.exists(file) {
            return Err(LaunchError::PayloadNotFound(file.to_path_buf()).into());
        }
    }

    let target = ask_target(request, prompt)?;
    let payload_name = file_name(&request.payload)?;
    let config_name = request.config.as_deref().map(file_name).transpose()?;

    reporter.step(&format!("Copying {} to {}", payload_name, target.host));
    let scp = scp_args(&target, &files);
    let scp: Vec<&str> = scp.iter().map(String::as_str).collect();
    info!(host = %target.host, key = %target.key.display(), "copying payload");
    let status = runner.run_status("scp", &scp).await?;
    if !status.success() {
        let code = status.code().unwrap_or(1);
        warn!(code, "copy to remote host failed");
        reporter.warn(&format!("scp exited with {code}"));
        return Ok(code);
    }

    reporter.step(&format!("Provisioning {}", target.destination()));
    let ssh = ssh_args(&target, &payload_name, config_name.as_deref());
    let ssh: Vec<&str> = ssh.iter().map(String::as_str).collect();
    let status = runner.run_status("ssh", &ssh).await?;
    let code = status.code().unwrap_or(1);
    if code == 0 {
        info!(host = %target.host, "remote provisioning finished");
        reporter.success(&format!("Provisioned {}", target.host));
    } else {
        warn!(host = %target.host, code, "remote provisioning failed");
        reporter.warn(&format!("remote provisioning exited with {code}"));
    }
    Ok(code)
}

fn ask_target(request: &LaunchRequest, prompt: &impl LauncherPrompt) -> Result<LaunchTarget> {
    let host = match &request.host {
        Some(host) => host.clone(),
        None => prompt.ask("Remote host", None)?,
    };
    let host = host.trim().to_string();
    if host.is_empty() {
        return Err(LaunchError::MissingHost.into());
    }
    let user = match &request.user {
        Some(user) => user.clone(),
        None => prompt.ask("Remote user", Some(DEFAULT_ADMIN_USER))?,
    };
    let user = match user.trim() {
        "" => DEFAULT_ADMIN_USER.to_string(),
        u => u.to_string(),
    };
    let selector = match &request.key {
        Some(key) => key.clone(),
        None => prompt.ask("SSH key (0 = default, n = numbered, or a path)", Some("0"))?,
    };
    let key = resolve_key_path(
        &request.home,
        &request.home.join(".ssh"),
        DEFAULT_KEY_BASE,
        &selector,
    )?;
    Ok(LaunchTarget { host, user, key })
}

/// Local path of the config's `env_source`. The remote side resolves it
/// against the config's directory, so only a bare file name survives the copy.
fn env_source_file(request: &LaunchRequest) -> Result<Option<PathBuf>, LaunchError> {
    let (Some(config), Some(env_source)) = (&request.config, &request.env_source) else {
        return Ok(None);
    };
    let mut components = env_source.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return Err(LaunchError::EnvSourceNotPortable(env_source.clone())),
    }
    let dir = config.parent().unwrap_or_else(|| Path::new(""));
    Ok(Some(dir.join(env_source)))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}
