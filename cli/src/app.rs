//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags. Adding a cross-cutting
//! concern means one field here; command signatures stay the same.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

use crate::domain::config::ProvisionConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::{self as config_loader, ConfigSource};
use crate::infra::logging::{self, LogTarget};
use crate::infra::prompt::TerminalGate;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `HOSTPREP_YES` env vars).
    pub yes: bool,
    /// Config file named by `--config`.
    pub config: Option<PathBuf>,
    /// Log file named by `--log-file`, overriding the configured one.
    pub log_file: Option<PathBuf>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Process runner used by every command.
    pub runner: TokioCommandRunner,
    /// Where the configuration set is read from.
    pub config_source: ConfigSource,
    /// `--log-file` override.
    pub log_file: Option<PathBuf>,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `HOSTPREP_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: &AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("HOSTPREP_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        // Progress lines would corrupt the JSON document on stdout.
        let quiet = flags.output.quiet || flags.output.json;

        Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            runner: TokioCommandRunner,
            config_source: ConfigSource::select(flags.behaviour.config.as_deref()),
            log_file: flags.behaviour.log_file.clone(),
            non_interactive,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress reporter for application services.
    #[must_use]
    pub fn terminal_reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Deploy-key confirmation gate honouring `--yes` / `CI`.
    #[must_use]
    pub fn registration_gate(&self) -> TerminalGate {
        TerminalGate {
            non_interactive: self.non_interactive,
        }
    }

    /// Load and validate the configuration set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing (explicit path only),
    /// unreadable, unparsable or invalid.
    pub fn load_config(&self) -> Result<ProvisionConfig> {
        config_loader::load(&self.config_source)
    }

    /// Send log records to the run's log file (`--log-file` wins over the
    /// configured path).
    ///
    /// # Errors
    ///
    /// Returns an error if a subscriber is already installed.
    pub fn init_file_logging(&self, cfg: &ProvisionConfig) -> Result<Option<WorkerGuard>> {
        let path: &Path = self.log_file.as_deref().unwrap_or(&cfg.log_file);
        logging::init(LogTarget::File(path))
    }

    /// Send warnings and errors to stderr.
    ///
    /// # Errors
    ///
    /// Returns an error if a subscriber is already installed.
    pub fn init_stderr_logging(&self) -> Result<()> {
        logging::init(LogTarget::Stderr).map(|_| ())
    }
}
