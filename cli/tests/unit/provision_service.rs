//! Unit tests for the provisioning pipeline service.
//!
//! The pipeline runs against [`FakeHost`], which records command lines and
//! keeps files in memory, so every test is hermetic.

#![allow(clippy::expect_used)]

use std::path::Path;

use hostprep_cli::application::ports::HostFs;
use hostprep_cli::application::services::provision::{ProvisionOptions, provision};
use hostprep_cli::domain::config::ProvisionConfig;
use hostprep_cli::domain::deploy_key::DeployKeyState;
use hostprep_cli::domain::error::ProvisionError;
use hostprep_cli::domain::step::{ProvisionReport, Step, StepOutcome};

use crate::helpers::test_config;
use crate::mocks::{FakeHost, MockGate, NoopReporter};

const ADMIN_KEYS: &str = "/home/ubuntu/.ssh/authorized_keys";

async fn run(cfg: &ProvisionConfig, host: &FakeHost, gate: &MockGate, steps: &[Step]) -> ProvisionReport {
    provision(
        cfg,
        host,
        host,
        host,
        gate,
        &NoopReporter,
        &ProvisionOptions {
            steps,
            hostname: "web1",
        },
    )
    .await
    .expect("provisioning returns a report")
}

fn outcome(report: &ProvisionReport, step: Step) -> &StepOutcome {
    &report.get(step).expect("step recorded").outcome
}

/// Mark the repository as cloned, as a successful deploy script would.
fn cloned(host: FakeHost, cfg: &ProvisionConfig) -> FakeHost {
    host.with_dir(cfg.repo_dir.join(".git"))
}

// ── Precondition ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unprivileged_run_fails_before_any_side_effect() {
    let cfg = test_config();
    let host = FakeHost::unprivileged();
    let gate = MockGate::confirming();

    let err = provision(
        &cfg,
        &host,
        &host,
        &host,
        &gate,
        &NoopReporter,
        &ProvisionOptions {
            steps: &Step::ALL,
            hostname: "web1",
        },
    )
    .await
    .expect_err("must refuse to run");

    assert!(matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::NotPrivileged)
    ));
    assert_eq!(host.calls(), vec!["id -u".to_string()]);
    assert!(!host.exists(&cfg.env_file));
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_host_runs_every_step_in_order() {
    let cfg = test_config();
    let host = FakeHost::new().with_file(ADMIN_KEYS, "ssh-ed25519 AAAA admin@laptop\n");
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &Step::ALL).await;

    assert!(report.is_success(), "failures: {:?}", report.failures().collect::<Vec<_>>());
    let order: Vec<Step> = report.steps.iter().map(|r| r.step).collect();
    assert_eq!(order, Step::ALL.to_vec());
    assert_eq!(report.deploy_key, Some(DeployKeyState::InUse));
    assert!(report.finished_at.is_some());
}

#[tokio::test]
async fn test_packages_step_installs_runtime_non_interactively() {
    let cfg = test_config();
    let host = FakeHost::new();
    let gate = MockGate::confirming();

    run(&cfg, &host, &gate, &[Step::Packages]).await;

    assert!(host.ran("env DEBIAN_FRONTEND=noninteractive apt-get update"));
    assert!(host.ran("bash -c curl -fsSL https://deb.nodesource.com/setup_20.x"));
    assert!(host.ran(
        "env DEBIAN_FRONTEND=noninteractive apt-get install -y nodejs git build-essential"
    ));
}

#[tokio::test]
async fn test_env_file_is_owner_only_and_owned_by_app_account() {
    let cfg = test_config();
    let host = FakeHost::new().with_account("app");
    let gate = MockGate::confirming();

    run(&cfg, &host, &gate, &[Step::EnvFile]).await;

    assert_eq!(host.mode(&cfg.env_file), Some(0o600));
    assert_eq!(
        host.content(&cfg.env_file).as_deref(),
        Some("NODE_ENV=production\nPORT=3000\n")
    );
    assert!(host.ran(&format!("chown app:app {}", cfg.env_file.display())));
}

#[tokio::test]
async fn test_deploy_script_is_executable_and_pins_branch() {
    let cfg = test_config();
    let host = FakeHost::new();
    let gate = MockGate::confirming();

    run(&cfg, &host, &gate, &[Step::DeployScript]).await;

    assert_eq!(host.mode(&cfg.deploy_script), Some(0o755));
    let script = host.content(&cfg.deploy_script).expect("script written");
    assert!(script.contains("BRANCH=\"release\""));
    assert!(host.ran(&format!("chown app:app {}", cfg.deploy_script.display())));
}

#[tokio::test]
async fn test_cache_config_writes_both_files_then_restarts() {
    let cfg = test_config();
    let host = FakeHost::new();
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &[Step::CacheConfig]).await;

    assert_eq!(outcome(&report, Step::CacheConfig), &StepOutcome::Succeeded);
    let options = host.content(&cfg.cache_default_file).expect("options written");
    assert!(options.contains(&format!("-f {}", cfg.cache_vcl_file.display())));
    let vcl = host.content(&cfg.cache_vcl_file).expect("vcl written");
    assert!(vcl.contains(".port = \"3000\";"));
    assert!(host.ran("systemctl restart varnish"));
}

#[tokio::test]
async fn test_authorized_keys_skipped_without_admin_keys() {
    let cfg = test_config();
    let host = FakeHost::new();
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &[Step::AuthorizedKeys]).await;

    assert!(matches!(
        outcome(&report, Step::AuthorizedKeys),
        StepOutcome::Skipped { .. }
    ));
    assert!(host.calls().iter().all(|c| !c.starts_with("chmod")));
}

#[tokio::test]
async fn test_authorized_keys_copied_with_restrictive_mode() {
    let cfg = test_config();
    let host = FakeHost::new().with_file(ADMIN_KEYS, "ssh-ed25519 AAAA admin@laptop\n");
    let gate = MockGate::confirming();

    run(&cfg, &host, &gate, &[Step::AuthorizedKeys]).await;

    let target = cfg.app_ssh_dir().join("authorized_keys");
    assert_eq!(host.mode(&target), Some(0o600));
    assert_eq!(
        host.content(&target).as_deref(),
        Some("ssh-ed25519 AAAA admin@laptop\n")
    );
    assert!(host.ran(&format!("chmod 700 {}", cfg.app_ssh_dir().display())));
}

// ── Re-runs and idempotence ──────────────────────────────────────────────────

#[tokio::test]
async fn test_existing_account_warns_and_continues() {
    let cfg = test_config();
    let host = FakeHost::new().with_account("app");
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &Step::ALL).await;

    let record = report.get(Step::AppAccount).expect("recorded");
    assert_eq!(record.outcome, StepOutcome::Succeeded);
    assert!(record.warnings.iter().any(|w| w.contains("already exists")));
    assert!(!host.ran("useradd"));
    assert_eq!(outcome(&report, Step::Cleanup), &StepOutcome::Succeeded);
}

#[tokio::test]
async fn test_existing_deploy_key_is_neither_regenerated_nor_reconfirmed() {
    let cfg = test_config();
    let host = cloned(FakeHost::new(), &cfg).with_file(&cfg.deploy_key, "existing private key");
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &[Step::DeployKey]).await;

    assert!(matches!(
        outcome(&report, Step::DeployKey),
        StepOutcome::Skipped { .. }
    ));
    assert!(host.calls().iter().all(|c| !c.contains("ssh-keygen")));
    assert_eq!(gate.calls(), 0);
    assert_eq!(host.content(&cfg.deploy_key).as_deref(), Some("existing private key"));
    assert_eq!(report.deploy_key, Some(DeployKeyState::InUse));
}

#[tokio::test]
async fn test_second_run_reuses_account_and_key() {
    let cfg = test_config();
    let host = FakeHost::new();
    let gate = MockGate::confirming();

    run(&cfg, &host, &gate, &Step::ALL).await;
    assert_eq!(host.count("useradd"), 1);
    assert_eq!(gate.calls(), 1);

    let host = cloned(host, &cfg);
    host.clear_calls();
    let report = run(&cfg, &host, &gate, &Step::ALL).await;

    assert!(report.is_success());
    assert!(!host.ran("useradd"));
    assert!(host.calls().iter().all(|c| !c.contains("ssh-keygen")));
    assert_eq!(gate.calls(), 1, "registration must not be asked again");
    assert_eq!(host.mode(&cfg.env_file), Some(0o600));
}

// ── Deploy key lifecycle ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_generated_key_is_shown_to_gate() {
    let cfg = test_config();
    let host = FakeHost::new();
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &[Step::DeployKey]).await;

    assert_eq!(outcome(&report, Step::DeployKey), &StepOutcome::Succeeded);
    assert!(host.ran(&format!(
        "sudo -u app -H ssh-keygen -t ed25519 -N  -C app@web1 (hostprep deploy key) -f {}",
        cfg.deploy_key.display()
    )));
    let key = gate.last_key().expect("key presented");
    assert!(key.starts_with("ssh-ed25519 "));
    assert_eq!(report.deploy_key, Some(DeployKeyState::RegisteredPending));
    let ssh_config = host
        .content(&cfg.app_ssh_dir().join("config"))
        .expect("ssh config written");
    assert!(ssh_config.contains("Host github.com"));
}

#[tokio::test]
async fn test_declined_registration_fails_step_but_pipeline_continues() {
    let cfg = test_config();
    let host = FakeHost::new();
    let gate = MockGate::declining();

    let report = run(&cfg, &host, &gate, &Step::ALL).await;

    assert!(outcome(&report, Step::DeployKey).is_failure());
    assert_eq!(report.deploy_key, Some(DeployKeyState::Generated));
    assert!(host.ran(&format!("sudo -u app -H {}", cfg.deploy_script.display())));
    assert_eq!(outcome(&report, Step::Cleanup), &StepOutcome::Succeeded);
}

#[tokio::test]
async fn test_key_from_earlier_run_is_in_use_after_successful_deploy() {
    let cfg = test_config();
    let host = FakeHost::new()
        .with_file(&cfg.deploy_key, "private key from an interrupted run")
        .with_file(&cfg.env_file, "NODE_ENV=production\n")
        .with_file(&cfg.deploy_script, "#!/usr/bin/env bash\n");
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &[Step::DeployKey, Step::Deploy]).await;

    assert_eq!(outcome(&report, Step::Deploy), &StepOutcome::Succeeded);
    assert_eq!(gate.calls(), 0);
    assert_eq!(report.deploy_key, Some(DeployKeyState::InUse));
}

#[tokio::test]
async fn test_key_from_earlier_run_stays_generated_when_deploy_fails() {
    let cfg = test_config();
    let host = FakeHost::new()
        .with_file(&cfg.deploy_key, "private key from an interrupted run")
        .with_file(&cfg.env_file, "NODE_ENV=production\n")
        .with_file(&cfg.deploy_script, "#!/usr/bin/env bash\n")
        .failing("sudo -u app -H", 128);
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &[Step::Deploy]).await;

    assert!(outcome(&report, Step::Deploy).is_failure());
    assert_eq!(report.deploy_key, Some(DeployKeyState::Generated));
}

// ── Failure handling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_step_is_recorded_and_later_steps_still_run() {
    let cfg = test_config();
    let host = FakeHost::new().failing("env DEBIAN_FRONTEND=noninteractive apt-get update", 100);
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &Step::ALL).await;

    assert!(!report.is_success());
    let failed: Vec<Step> = report.failures().map(|r| r.step).collect();
    assert_eq!(failed, vec![Step::Packages]);
    let StepOutcome::Failed { reason } = outcome(&report, Step::Packages) else {
        panic!("packages must fail");
    };
    assert!(reason.contains("exited with 100"), "reason: {reason}");
    assert!(host.ran("env DEBIAN_FRONTEND=noninteractive apt-get install -y nginx varnish"));
}

#[tokio::test]
async fn test_deploy_fails_when_env_file_is_missing() {
    let cfg = test_config();
    let host = FakeHost::new();
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &[Step::Deploy]).await;

    let StepOutcome::Failed { reason } = outcome(&report, Step::Deploy) else {
        panic!("deploy must fail");
    };
    assert!(reason.contains(&cfg.env_file.display().to_string()));
    assert!(!host.ran("sudo"));
}

#[tokio::test]
async fn test_unselected_steps_are_skipped_without_commands() {
    let cfg = test_config();
    let host = FakeHost::new();
    let gate = MockGate::confirming();

    let report = run(&cfg, &host, &gate, &[Step::Cleanup]).await;

    assert_eq!(report.steps.len(), Step::ALL.len());
    assert_eq!(
        outcome(&report, Step::Packages),
        &StepOutcome::skipped("not selected")
    );
    assert_eq!(
        host.calls(),
        vec![
            "id -u".to_string(),
            "env DEBIAN_FRONTEND=noninteractive apt-get autoremove -y".to_string(),
            "env DEBIAN_FRONTEND=noninteractive apt-get clean".to_string(),
        ]
    );
}

// ── Real filesystem ──────────────────────────────────────────────────────────

#[cfg(unix)]
#[tokio::test]
async fn test_env_file_mode_on_disk_survives_regeneration() {
    use std::os::unix::fs::PermissionsExt;

    use hostprep_cli::infra::fs::LocalFs;

    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = crate::helpers::config_under(dir.path());
    let host = FakeHost::new();
    let gate = MockGate::confirming();

    for _ in 0..2 {
        provision(
            &cfg,
            &host,
            &LocalFs,
            &host,
            &gate,
            &NoopReporter,
            &ProvisionOptions {
                steps: &[Step::EnvFile],
                hostname: "web1",
            },
        )
        .await
        .expect("report");
        std::fs::set_permissions(&cfg.env_file, std::fs::Permissions::from_mode(0o644))
            .expect("loosen between runs");
    }
    provision(
        &cfg,
        &host,
        &LocalFs,
        &host,
        &gate,
        &NoopReporter,
        &ProvisionOptions {
            steps: &[Step::EnvFile],
            hostname: "web1",
        },
    )
    .await
    .expect("report");

    let mode = std::fs::metadata(&cfg.env_file).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert!(Path::new(&cfg.env_file).exists());
}
