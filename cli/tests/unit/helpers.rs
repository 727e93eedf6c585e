//! Shared test helpers: exit statuses, outputs and a sandboxed configuration.

#![allow(dead_code)]

use std::path::Path;
use std::process::{ExitStatus, Output};

use hostprep_cli::domain::config::{ConfigFile, ProvisionConfig};

// ── Cross-platform ExitStatus construction ───────────────────────────────────

/// Build an `ExitStatus` from a logical exit code (0 = success, non-zero = failure).
///
/// On Unix the raw wait-status encodes the exit code in bits 8–15, so we shift.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    ExitStatus::from_raw(code as u32)
}

// ── Output constructors ──────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Configuration ────────────────────────────────────────────────────────────

/// A configuration whose every path lives under `root`.
pub fn config_under(root: &Path) -> ProvisionConfig {
    let file = ConfigFile {
        repo_url: Some("git@github.com:acme/site.git".to_string()),
        branch: Some("release".to_string()),
        app_home: Some(root.join("home/app")),
        log_file: Some(root.join("var/log/hostprep.log")),
        cache_default_file: Some(root.join("etc/default/varnish")),
        cache_vcl_file: Some(root.join("etc/varnish/default.vcl")),
        environment: [
            ("NODE_ENV".to_string(), serde_yaml::Value::from("production")),
            ("PORT".to_string(), serde_yaml::Value::from(3000)),
        ]
        .into_iter()
        .collect(),
        ..ConfigFile::default()
    };
    #[allow(clippy::expect_used)]
    ProvisionConfig::resolve(file, Vec::new()).expect("test config is valid")
}

/// [`config_under`] rooted at a fixed, never-created directory, for fakes.
pub fn test_config() -> ProvisionConfig {
    config_under(Path::new("/srv/hostprep-test"))
}
