//! hostprep - provision a host for a Node.js application

use std::process::ExitCode;

use clap::Parser;

use hostprep_cli::cli::Cli;
use hostprep_cli::output::json;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            if json_mode {
                if let Ok(out) = json::format_error(&format!("{e:#}"), error_code(&e)) {
                    println!("{out}");
                }
            }
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn error_code(e: &anyhow::Error) -> &'static str {
    use hostprep_cli::domain::error::{ConfigError, LaunchError, ProvisionError};
    if matches!(e.downcast_ref::<ProvisionError>(), Some(ProvisionError::NotPrivileged)) {
        "not-privileged"
    } else if e.downcast_ref::<ConfigError>().is_some() {
        "invalid-config"
    } else if e.downcast_ref::<LaunchError>().is_some() {
        "launch-failed"
    } else {
        "error"
    }
}
