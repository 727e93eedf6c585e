//! Application service: provisioning pipeline use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.
//!
//! The privilege check is the only fatal condition. After it, every step
//! runs in order and records its own outcome; a failed step never stops the
//! ones after it.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::application::ports::{
    CommandRunner, HostFs, KeyRegistrationGate, PrivilegeProbe, ProgressReporter,
};
use crate::application::services::step_runner::StepRunner;
use crate::domain::config::ProvisionConfig;
use crate::domain::deploy_key::{DeployKeyEvent, DeployKeyState};
use crate::domain::envfile::{ENV_FILE_MODE, render_env_file};
use crate::domain::error::ProvisionError;
use crate::domain::ssh::{SSH_FILE_MODE, key_comment, render_client_config, validate_public_key};
use crate::domain::step::{ProvisionReport, Step, StepOutcome, StepRecord};
use crate::domain::template::{
    CacheParams, DEPLOY_SCRIPT_MODE, DeployScriptParams, render_cache_options, render_cache_vcl,
    render_deploy_script,
};

/// Mode of generated, world-readable config files.
const CONFIG_FILE_MODE: u32 = 0o644;

/// Packages installed alongside the runtime.
const RUNTIME_PACKAGES: &[&str] = &["nodejs", "git", "build-essential"];

/// Reverse proxy and cache daemon packages.
const PROXY_CACHE_PACKAGES: &[&str] = &["nginx", "varnish"];

/// Service name of the cache daemon.
const CACHE_SERVICE: &str = "varnish";

/// Per-run options.
pub struct ProvisionOptions<'a> {
    /// Steps to execute; the others are recorded as skipped.
    pub steps: &'a [Step],
    /// Machine hostname, used in the deploy key comment.
    pub hostname: &'a str,
}

/// Provision the host.
///
/// # Errors
///
/// Returns [`ProvisionError::NotPrivileged`] (before any side effect) when
/// not running as root, or an error if the privilege check itself fails.
/// Step failures are reported in the returned [`ProvisionReport`], never as
/// an error.
pub async fn provision(
    cfg: &ProvisionConfig,
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    privilege: &impl PrivilegeProbe,
    gate: &impl KeyRegistrationGate,
    reporter: &impl ProgressReporter,
    opts: &ProvisionOptions<'_>,
) -> Result<ProvisionReport> {
    if !privilege.is_privileged().await? {
        return Err(ProvisionError::NotPrivileged.into());
    }

    info!(repo = %cfg.repo_url, branch = %cfg.branch, "provisioning started");
    let observed_key = DeployKeyState::observe(
        fs.exists(&cfg.deploy_key),
        fs.exists(&cfg.repo_dir.join(".git")),
    );
    let mut pipeline = Pipeline {
        cfg,
        runner,
        fs,
        gate,
        hostname: opts.hostname,
        observed_key,
        key_state: observed_key,
    };

    let mut report = ProvisionReport::new(Utc::now());
    for step in Step::ALL {
        if !opts.steps.contains(&step) {
            report.push(StepRecord {
                step,
                outcome: StepOutcome::skipped("not selected"),
                commands: Vec::new(),
                warnings: Vec::new(),
            });
            continue;
        }
        reporter.step(step.title());
        let record = pipeline.run_step(step).await;
        match &record.outcome {
            StepOutcome::Succeeded => reporter.success(step.title()),
            StepOutcome::Skipped { reason } => reporter.success(&format!("{}: {reason}", step.title())),
            StepOutcome::Failed { reason } => reporter.warn(&format!("{}: {reason}", step.title())),
        }
        for warning in &record.warnings {
            reporter.warn(warning);
        }
        report.push(record);
    }
    report.deploy_key = Some(pipeline.key_state);
    report.finish(Utc::now());

    let failed = report.failures().count();
    if failed == 0 {
        info!("provisioning finished");
    } else {
        warn!(failed, "provisioning finished with failed steps");
    }
    Ok(report)
}

struct Pipeline<'a, R, F, G> {
    cfg: &'a ProvisionConfig,
    runner: &'a R,
    fs: &'a F,
    gate: &'a G,
    hostname: &'a str,
    /// State found on disk when the run started.
    observed_key: DeployKeyState,
    key_state: DeployKeyState,
}

impl<R, F, G> Pipeline<'_, R, F, G>
where
    R: CommandRunner,
    F: HostFs,
    G: KeyRegistrationGate,
{
    async fn run_step(&mut self, step: Step) -> StepRecord {
        let s = StepRunner::new(self.runner, step);
        match step {
            Step::Packages => self.packages(s).await,
            Step::ProxyCache => self.proxy_cache(s).await,
            Step::AppAccount => self.app_account(s).await,
            Step::Supervisor => self.supervisor(s).await,
            Step::AuthorizedKeys => self.authorized_keys(s).await,
            Step::CacheConfig => self.cache_config(s).await,
            Step::EnvFile => self.env_file(s).await,
            Step::DeployScript => self.deploy_script(s).await,
            Step::DeployKey => self.deploy_key(s).await,
            Step::Deploy => self.deploy(s).await,
            Step::Cleanup => self.cleanup(s).await,
        }
    }

    async fn packages(&self, mut s: StepRunner<'_, R>) -> StepRecord {
        apt(&mut s, &["update"]).await;
        let setup = format!(
            "curl -fsSL https://deb.nodesource.com/setup_{}.x | bash -",
            self.cfg.node_major
        );
        s.run("bash", &["-c", &setup]).await;
        apt_install(&mut s, RUNTIME_PACKAGES).await;
        s.finish()
    }

    async fn proxy_cache(&self, mut s: StepRunner<'_, R>) -> StepRecord {
        apt_install(&mut s, PROXY_CACHE_PACKAGES).await;
        s.finish()
    }

    async fn app_account(&self, mut s: StepRunner<'_, R>) -> StepRecord {
        let cfg = self.cfg;
        let home = cfg.app_home.display().to_string();
        if s.run_tolerant("id", &["-u", &cfg.app_user]).await {
            s.warn(format!("account '{}' already exists, keeping it", cfg.app_user));
        } else {
            s.run(
                "useradd",
                &["--create-home", "--home-dir", &home, "--shell", "/bin/bash", &cfg.app_user],
            )
            .await;
        }
        if let Err(e) = self.fs.create_dir_all(&cfg.app_dir) {
            s.fail(format!("{e:#}"));
        }
        s.run("chown", &["-R", &cfg.app_owner(), &home]).await;
        s.finish()
    }

    async fn supervisor(&self, mut s: StepRunner<'_, R>) -> StepRecord {
        let cfg = self.cfg;
        s.run("npm", &["install", "-g", "pm2"]).await;
        let admin_home = cfg.admin_home().display().to_string();
        let app_home = cfg.app_home.display().to_string();
        for (user, home) in [(&cfg.admin_user, &admin_home), (&cfg.app_user, &app_home)] {
            s.run("pm2", &["startup", "systemd", "-u", user, "--hp", home]).await;
        }
        s.finish()
    }

    async fn authorized_keys(&self, mut s: StepRunner<'_, R>) -> StepRecord {
        let cfg = self.cfg;
        let source = cfg.admin_home().join(".ssh").join("authorized_keys");
        if !self.fs.exists(&source) {
            return s.skip(format!("{} not found", source.display()));
        }
        let ssh_dir = cfg.app_ssh_dir();
        let target = ssh_dir.join("authorized_keys");
        let copied = self
            .fs
            .create_dir_all(&ssh_dir)
            .and_then(|()| self.fs.read_to_string(&source))
            .and_then(|keys| self.fs.write_file(&target, &keys, SSH_FILE_MODE));
        if let Err(e) = copied {
            s.fail(format!("{e:#}"));
            return s.finish();
        }
        let ssh_dir = ssh_dir.display().to_string();
        s.run("chmod", &["700", &ssh_dir]).await;
        s.run("chown", &["-R", &cfg.app_owner(), &ssh_dir]).await;
        s.finish()
    }

    async fn cache_config(&self, mut s: StepRunner<'_, R>) -> StepRecord {
        let cfg = self.cfg;
        let params = CacheParams::from_config(cfg);
        let files = [
            (&cfg.cache_default_file, render_cache_options(&params)),
            (&cfg.cache_vcl_file, render_cache_vcl(&params)),
        ];
        for (path, rendered) in files {
            let written = rendered
                .map_err(anyhow::Error::from)
                .and_then(|content| self.write_with_parent(path, &content, CONFIG_FILE_MODE));
            if let Err(e) = written {
                s.fail(format!("{}: {e:#}", path.display()));
            }
        }
        if s.has_failed() {
            return s.finish();
        }
        s.run("systemctl", &["restart", CACHE_SERVICE]).await;
        s.finish()
    }

    async fn env_file(&self, mut s: StepRunner<'_, R>) -> StepRecord {
        let cfg = self.cfg;
        if cfg.environment.is_empty() {
            s.warn("no environment entries configured; writing an empty environment file");
        }
        let written = render_env_file(&cfg.environment)
            .map_err(anyhow::Error::from)
            .and_then(|content| self.write_with_parent(&cfg.env_file, &content, ENV_FILE_MODE));
        if let Err(e) = written {
            s.fail(format!("{}: {e:#}", cfg.env_file.display()));
            return s.finish();
        }
        s.run("chown", &[&cfg.app_owner(), &cfg.env_file.display().to_string()])
            .await;
        s.finish()
    }

    async fn deploy_script(&self, mut s: StepRunner<'_, R>) -> StepRecord {
        let cfg = self.cfg;
        let written = render_deploy_script(&DeployScriptParams::from_config(cfg))
            .map_err(anyhow::Error::from)
            .and_then(|content| {
                self.write_with_parent(&cfg.deploy_script, &content, DEPLOY_SCRIPT_MODE)
            });
        if let Err(e) = written {
            s.fail(format!("{}: {e:#}", cfg.deploy_script.display()));
            return s.finish();
        }
        s.run(
            "chown",
            &[&cfg.app_owner(), &cfg.deploy_script.display().to_string()],
        )
        .await;
        s.finish()
    }

    async fn deploy_key(&mut self, mut s: StepRunner<'_, R>) -> StepRecord {
        let cfg = self.cfg;
        let ssh_dir = cfg.app_ssh_dir();
        let ssh_config = ssh_dir.join("config");
        let config = render_client_config(&cfg.git_host, &cfg.deploy_key);
        match self.write_with_parent(&ssh_config, &config, SSH_FILE_MODE) {
            Ok(()) => {
                s.run("chown", &["-R", &cfg.app_owner(), &ssh_dir.display().to_string()])
                    .await;
            }
            Err(e) => s.fail(format!("{}: {e:#}", ssh_config.display())),
        }

        if !self.key_state.needs_generation() {
            return s.skip(format!(
                "deploy key {} already present ({})",
                cfg.deploy_key.display(),
                self.key_state
            ));
        }

        let key_path = cfg.deploy_key.display().to_string();
        let comment = key_comment(&cfg.app_user, self.hostname);
        let generated = s
            .run(
                "sudo",
                &[
                    "-u", &cfg.app_user, "-H", "ssh-keygen", "-t", "ed25519", "-N", "", "-C",
                    &comment, "-f", &key_path,
                ],
            )
            .await;
        if !generated {
            return s.finish();
        }
        self.transition(&mut s, DeployKeyEvent::Generate);

        let public_path = cfg.deploy_key.with_extension("pub");
        let public_key = match self.fs.read_to_string(&public_path) {
            Ok(key) => key,
            Err(e) => {
                s.fail(format!("{e:#}"));
                return s.finish();
            }
        };
        if let Err(e) = validate_public_key(&public_key) {
            s.warn(format!("{e:#}"));
        }

        match self.gate.confirm_registration(public_key.trim(), &cfg.git_host) {
            Ok(true) => self.transition(&mut s, DeployKeyEvent::RegistrationConfirmed),
            Ok(false) => s.fail(format!(
                "deploy key registration with {} was not confirmed",
                cfg.git_host
            )),
            Err(e) => s.fail(format!("waiting for deploy key registration: {e:#}")),
        }
        s.finish()
    }

    async fn deploy(&mut self, mut s: StepRunner<'_, R>) -> StepRecord {
        let cfg = self.cfg;
        for required in [&cfg.env_file, &cfg.deploy_script] {
            if !self.fs.exists(required) {
                s.fail(format!("{} is missing", required.display()));
            }
        }
        if s.has_failed() {
            return s.finish();
        }
        let script = cfg.deploy_script.display().to_string();
        let deployed = s.run("sudo", &["-u", &cfg.app_user, "-H", &script]).await;
        if deployed {
            // A key left by an earlier run that authenticated the checkout is
            // registered, whether or not that run saw the confirmation.
            if self.observed_key == DeployKeyState::Generated
                && self.key_state == DeployKeyState::Generated
            {
                self.transition(&mut s, DeployKeyEvent::RegistrationConfirmed);
            }
            if self.key_state == DeployKeyState::RegisteredPending {
                self.transition(&mut s, DeployKeyEvent::CloneSucceeded);
            }
        }
        s.finish()
    }

    async fn cleanup(&self, mut s: StepRunner<'_, R>) -> StepRecord {
        apt(&mut s, &["autoremove", "-y"]).await;
        apt(&mut s, &["clean"]).await;
        s.finish()
    }

    fn write_with_parent(&self, path: &std::path::Path, content: &str, mode: u32) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.fs.write_file(path, content, mode)
    }

    fn transition(&mut self, s: &mut StepRunner<'_, R>, event: DeployKeyEvent) {
        match self.key_state.apply(event) {
            Ok(next) => {
                info!(from = %self.key_state, to = %next, "deploy key state changed");
                self.key_state = next;
            }
            Err(e) => s.warn(e.to_string()),
        }
    }
}

async fn apt<R: CommandRunner>(s: &mut StepRunner<'_, R>, args: &[&str]) -> bool {
    let mut full = vec!["DEBIAN_FRONTEND=noninteractive", "apt-get"];
    full.extend_from_slice(args);
    s.run("env", &full).await
}

async fn apt_install<R: CommandRunner>(s: &mut StepRunner<'_, R>, packages: &[&str]) -> bool {
    let mut args = vec!["install", "-y"];
    args.extend_from_slice(packages);
    apt(s, &args).await
}
