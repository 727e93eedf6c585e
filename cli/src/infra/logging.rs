//! Log subscriber setup.
//!
//! Provisioning and deployment append timestamped records to a log file
//! through a non-blocking writer. When the file cannot be opened, records go
//! to stderr instead and the run continues.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset and a log file is in use.
const FILE_FILTER: &str = "info";

/// Default filter for stderr-only logging.
const STDERR_FILTER: &str = "warn";

/// Where log records go.
#[derive(Debug, Clone, Copy)]
pub enum LogTarget<'a> {
    /// Append to this file.
    File(&'a Path),
    /// Write warnings and errors to stderr.
    Stderr,
}

/// Install the global subscriber.
///
/// The returned guard flushes buffered records when dropped and must be held
/// until the process exits.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(target: LogTarget<'_>) -> Result<Option<WorkerGuard>> {
    match target {
        LogTarget::File(path) => match open_append(path) {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                tracing_subscriber::registry()
                    .with(filter(FILE_FILTER))
                    .with(fmt::layer().with_writer(writer).with_ansi(false))
                    .try_init()
                    .context("installing log subscriber")?;
                Ok(Some(guard))
            }
            Err(e) => {
                init_stderr(STDERR_FILTER)?;
                tracing::warn!("{e:#}; logging to stderr");
                Ok(None)
            }
        },
        LogTarget::Stderr => {
            init_stderr(STDERR_FILTER)?;
            Ok(None)
        }
    }
}

fn init_stderr(default: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter(default))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("installing log subscriber")
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn open_append(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))
}
