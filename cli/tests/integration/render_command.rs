//! Integration tests for `hostprep render` and configuration loading.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn hostprep() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hostprep"));
    cmd.env("NO_COLOR", "1").env_remove("HOSTPREP_CONFIG");
    cmd
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("hostprep.yaml");
    std::fs::write(&path, body).expect("write config");
    path
}

const CONFIG: &str = "\
repo_url: git@github.com:acme/site.git
branch: release
instances: max
environment:
  PORT: 3000
  NODE_ENV: production
";

#[test]
fn test_render_deploy_script_substitutes_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), CONFIG);

    hostprep()
        .arg("--config")
        .arg(&config)
        .args(["render", "deploy-script"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("#!/usr/bin/env bash"))
        .stdout(predicate::str::contains(r#"BRANCH="release""#))
        .stdout(predicate::str::contains(r#"INSTANCES="max""#))
        .stdout(predicate::str::contains("{{").not());
}

#[test]
fn test_render_env_file_sorts_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), CONFIG);

    hostprep()
        .arg("--config")
        .arg(&config)
        .args(["render", "env-file"])
        .assert()
        .success()
        .stdout("NODE_ENV=production\nPORT=3000\n");
}

#[test]
fn test_render_reads_config_from_environment_variable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), CONFIG);

    hostprep()
        .env("HOSTPREP_CONFIG", &config)
        .args(["render", "env-file"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PORT=3000"));
}

#[test]
fn test_render_merges_env_source_under_inline_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("app.env"), "# secrets\nPORT=8080\nSECRET=s3\n")
        .expect("write env source");
    let config = write_config(dir.path(), &format!("{CONFIG}env_source: app.env\n"));

    hostprep()
        .arg("--config")
        .arg(&config)
        .args(["render", "env-file"])
        .assert()
        .success()
        .stdout("NODE_ENV=production\nPORT=3000\nSECRET=s3\n");
}

#[test]
fn test_render_missing_repo_url_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), "branch: main\n");

    hostprep()
        .arg("--config")
        .arg(&config)
        .args(["render", "deploy-script"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("repo_url is required"));
}

#[test]
fn test_render_missing_explicit_config_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");

    hostprep()
        .arg("--config")
        .arg(dir.path().join("absent.yaml"))
        .args(["render", "env-file"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_render_cache_vcl_points_at_backend_port() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), &format!("{CONFIG}backend_port: 4000\n"));

    hostprep()
        .arg("--config")
        .arg(&config)
        .args(["render", "cache-vcl"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#".port = "4000";"#));
}
