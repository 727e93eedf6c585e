//! `PrivilegeProbe` backed by `id -u`.

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, PrivilegeProbe};

/// Asks `id -u` for the effective user id through a [`CommandRunner`].
pub struct IdProbe<'a, R: CommandRunner> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> IdProbe<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> PrivilegeProbe for IdProbe<'_, R> {
    async fn is_privileged(&self) -> Result<bool> {
        let output = self
            .runner
            .run("id", &["-u"])
            .await
            .context("determining the effective user")?;
        anyhow::ensure!(output.status.success(), "id -u exited with {}", output.status);
        Ok(String::from_utf8_lossy(&output.stdout).trim() == "0")
    }
}
