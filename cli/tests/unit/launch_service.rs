//! Unit tests for the remote launcher service.

#![allow(clippy::expect_used)]

use std::path::PathBuf;

use hostprep_cli::application::services::launch::{LaunchRequest, launch};
use hostprep_cli::domain::error::LaunchError;

use crate::mocks::{FakeHost, NoopReporter, ScriptedPrompt};

const PAYLOAD: &str = "/opt/bin/hostprep";
const CONFIG: &str = "/work/site.yaml";

fn request() -> LaunchRequest {
    LaunchRequest {
        payload: PathBuf::from(PAYLOAD),
        home: PathBuf::from("/home/op"),
        ..LaunchRequest::default()
    }
}

fn host_with_payload() -> FakeHost {
    FakeHost::new().with_file(PAYLOAD, "#!binary")
}

#[tokio::test]
async fn test_missing_payload_fails_before_prompting() {
    let host = FakeHost::new();
    let prompt = ScriptedPrompt::new(&[]);

    let err = launch(&request(), &host, &host, &prompt, &NoopReporter)
        .await
        .expect_err("must fail");

    let launch_err = err.downcast_ref::<LaunchError>().expect("launch error");
    assert_eq!(launch_err.to_string(), format!("Cannot find {PAYLOAD} to copy."));
    assert!(host.calls().is_empty());
    assert!(prompt.questions.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_missing_config_is_reported_like_payload() {
    let host = host_with_payload();
    let prompt = ScriptedPrompt::new(&[]);
    let req = LaunchRequest {
        config: Some(PathBuf::from(CONFIG)),
        ..request()
    };

    let err = launch(&req, &host, &host, &prompt, &NoopReporter)
        .await
        .expect_err("must fail");

    assert!(err.to_string().contains(CONFIG));
}

#[tokio::test]
async fn test_answers_drive_copy_and_remote_run() {
    let host = host_with_payload().with_file(CONFIG, "repo_url: x\n");
    let prompt = ScriptedPrompt::new(&["web1.example.com", "", "2"]);
    let req = LaunchRequest {
        config: Some(PathBuf::from(CONFIG)),
        ..request()
    };

    let code = launch(&req, &host, &host, &prompt, &NoopReporter)
        .await
        .expect("launch");

    assert_eq!(code, 0);
    assert_eq!(
        host.calls(),
        vec![
            format!(
                "scp -i /home/op/.ssh/id_rsa_2 {PAYLOAD} {CONFIG} ubuntu@web1.example.com:/tmp/"
            ),
            "ssh -t -i /home/op/.ssh/id_rsa_2 ubuntu@web1.example.com \
             sudo /tmp/hostprep provision --config /tmp/site.yaml"
                .to_string(),
        ]
    );
}

#[tokio::test]
async fn test_env_source_travels_with_config() {
    let host = host_with_payload()
        .with_file(CONFIG, "repo_url: x\nenv_source: site.env\n")
        .with_file("/work/site.env", "SECRET=s3\n");
    let prompt = ScriptedPrompt::new(&[]);
    let req = LaunchRequest {
        host: Some("web1".to_string()),
        user: Some("ubuntu".to_string()),
        key: Some("0".to_string()),
        config: Some(PathBuf::from(CONFIG)),
        env_source: Some(PathBuf::from("site.env")),
        ..request()
    };

    launch(&req, &host, &host, &prompt, &NoopReporter)
        .await
        .expect("launch");

    assert!(host.ran(&format!(
        "scp -i /home/op/.ssh/id_rsa {PAYLOAD} {CONFIG} /work/site.env ubuntu@web1:/tmp/"
    )));
    assert!(host.ran("ssh -t -i /home/op/.ssh/id_rsa ubuntu@web1 sudo /tmp/hostprep provision --config /tmp/site.yaml"));
}

#[tokio::test]
async fn test_missing_env_source_fails_before_copy() {
    let host = host_with_payload().with_file(CONFIG, "repo_url: x\nenv_source: site.env\n");
    let prompt = ScriptedPrompt::new(&[]);
    let req = LaunchRequest {
        host: Some("web1".to_string()),
        config: Some(PathBuf::from(CONFIG)),
        env_source: Some(PathBuf::from("site.env")),
        ..request()
    };

    let err = launch(&req, &host, &host, &prompt, &NoopReporter)
        .await
        .expect_err("must fail");

    assert!(matches!(
        err.downcast_ref::<LaunchError>(),
        Some(LaunchError::PayloadNotFound(path)) if path == &PathBuf::from("/work/site.env")
    ));
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn test_env_source_outside_config_dir_is_rejected() {
    let prompt = ScriptedPrompt::new(&[]);
    for env_source in ["/etc/app/site.env", "secrets/site.env", "../site.env"] {
        let host = host_with_payload().with_file(CONFIG, "repo_url: x\n");
        let req = LaunchRequest {
            host: Some("web1".to_string()),
            config: Some(PathBuf::from(CONFIG)),
            env_source: Some(PathBuf::from(env_source)),
            ..request()
        };

        let err = launch(&req, &host, &host, &prompt, &NoopReporter)
            .await
            .expect_err("must fail");

        assert!(
            matches!(
                err.downcast_ref::<LaunchError>(),
                Some(LaunchError::EnvSourceNotPortable(_))
            ),
            "{env_source}: {err:#}"
        );
        assert!(host.calls().is_empty());
    }
}

#[tokio::test]
async fn test_flags_skip_prompts() {
    let host = host_with_payload();
    let prompt = ScriptedPrompt::new(&[]);
    let req = LaunchRequest {
        host: Some("10.0.0.5".to_string()),
        user: Some("admin".to_string()),
        key: Some("~/.ssh/gcp".to_string()),
        ..request()
    };

    launch(&req, &host, &host, &prompt, &NoopReporter)
        .await
        .expect("launch");

    assert!(host.ran("scp -i /home/op/.ssh/gcp /opt/bin/hostprep admin@10.0.0.5:/tmp/"));
    assert!(host.ran("ssh -t -i /home/op/.ssh/gcp admin@10.0.0.5 sudo /tmp/hostprep provision"));
}

#[tokio::test]
async fn test_remote_exit_status_is_returned() {
    let host = host_with_payload().failing("ssh", 3);
    let prompt = ScriptedPrompt::new(&["web1", "", ""]);

    let code = launch(&request(), &host, &host, &prompt, &NoopReporter)
        .await
        .expect("launch");

    assert_eq!(code, 3);
}

#[tokio::test]
async fn test_failed_copy_does_not_run_remotely() {
    let host = host_with_payload().failing("scp", 1);
    let prompt = ScriptedPrompt::new(&["web1", "", ""]);

    let code = launch(&request(), &host, &host, &prompt, &NoopReporter)
        .await
        .expect("launch");

    assert_eq!(code, 1);
    assert!(!host.ran("ssh"));
}

#[tokio::test]
async fn test_empty_host_is_rejected() {
    let host = host_with_payload();
    let prompt = ScriptedPrompt::new(&["  "]);

    let err = launch(&request(), &host, &host, &prompt, &NoopReporter)
        .await
        .expect_err("must fail");

    assert!(matches!(
        err.downcast_ref::<LaunchError>(),
        Some(LaunchError::MissingHost)
    ));
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_key_selector_is_rejected() {
    let host = host_with_payload();
    let prompt = ScriptedPrompt::new(&["web1", "", "work"]);

    let err = launch(&request(), &host, &host, &prompt, &NoopReporter)
        .await
        .expect_err("must fail");

    assert!(matches!(
        err.downcast_ref::<LaunchError>(),
        Some(LaunchError::InvalidKeySelector(_))
    ));
}
