//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` spawns processes with tokio. There is no timeout: a
//! command that never exits blocks the run until it is cancelled externally.

use std::process::{ExitStatus, Output, Stdio};

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

use crate::application::ports::CommandRunner;

/// Production `CommandRunner`.
///
/// `run` captures stdout and stderr; stdin is closed so a command that would
/// prompt fails instead of hanging on input nobody will type.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        let (status, stdout, stderr) = tokio::join!(
            child.wait(),
            async {
                let mut buf = Vec::new();
                if let Some(ref mut h) = stdout_handle {
                    let _ = h.read_to_end(&mut buf).await;
                }
                buf
            },
            async {
                let mut buf = Vec::new();
                if let Some(ref mut h) = stderr_handle {
                    let _ = h.read_to_end(&mut buf).await;
                }
                buf
            },
        );
        Ok(Output {
            status: status.with_context(|| format!("waiting for {program}"))?,
            stdout,
            stderr,
        })
    }

    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        child
            .wait()
            .await
            .with_context(|| format!("waiting for {program}"))
    }
}
