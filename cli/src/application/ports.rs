//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::{ExitStatus, Output};

use anyhow::Result;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
///
/// Implementations never apply a timeout: a hung command blocks the run.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Run a program with inherited stdio and return only its exit status.
    ///
    /// Used for interactive commands (remote execution over `ssh -t`).
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Host Filesystem Port ──────────────────────────────────────────────────────

/// Abstracts the filesystem of the machine being provisioned.
pub trait HostFs {
    /// Returns `true` if `path` exists.
    fn exists(&self, path: &Path) -> bool;
    /// Create a directory and all of its parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Write `content` to `path` (truncating) and set its mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or chmod fails.
    fn write_file(&self, path: &Path, content: &str, mode: u32) -> Result<()>;
    /// Read a file to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Replace whatever is at `link` with a symlink to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the old entry cannot be removed or the link
    /// cannot be created.
    fn symlink(&self, target: &Path, link: &Path) -> Result<()>;
}

// ── Privilege Port ────────────────────────────────────────────────────────────

/// Answers whether the current process may change system state.
#[allow(async_fn_in_trait)]
pub trait PrivilegeProbe {
    /// Returns `true` when running with root privileges.
    ///
    /// # Errors
    ///
    /// Returns an error if the effective user cannot be determined.
    async fn is_privileged(&self) -> Result<bool>;
}

// ── Deploy-key registration Port ──────────────────────────────────────────────

/// External confirmation that a freshly generated deploy key has been
/// registered with the git host. The only point where provisioning waits.
pub trait KeyRegistrationGate {
    /// Present `public_key` and block until the operator answers.
    ///
    /// Returns `false` when registration was declined.
    ///
    /// # Errors
    ///
    /// Returns an error if the confirmation cannot be obtained (no TTY).
    fn confirm_registration(&self, public_key: &str, git_host: &str) -> Result<bool>;
}

// ── Launcher prompt Port ──────────────────────────────────────────────────────

/// Interactive questions asked by the remote launcher.
pub trait LauncherPrompt {
    /// Ask for a value. An empty answer yields `default` when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails.
    fn ask(&self, question: &str, default: Option<&str>) -> Result<String>;
}
