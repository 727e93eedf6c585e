//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Provision a host for a Node.js application behind a caching proxy
#[derive(Parser)]
#[command(
    name = "hostprep",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file [default: $HOSTPREP_CONFIG or /etc/hostprep/hostprep.yaml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Answer prompts with their defaults (also: CI, HOSTPREP_YES)
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision this host (must run as root)
    Provision(commands::provision::ProvisionArgs),

    /// Clone or update the application and restart it
    Deploy,

    /// Copy hostprep to a remote host and provision it there
    Launch(commands::launch::LaunchArgs),

    /// Print a generated file without changing the host
    Render {
        #[arg(value_enum)]
        artifact: commands::render::Artifact,
    },

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails before producing a result.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            config,
            log_file,
            json,
            quiet,
            no_color,
            yes,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags {
                yes,
                config,
                log_file,
            },
        });

        match command {
            Command::Provision(args) => commands::provision::run(&args, &app).await,
            Command::Deploy => commands::deploy::run(&app).await,
            Command::Launch(args) => commands::launch::run(&args, &app).await,
            Command::Render { artifact } => commands::render::run(artifact, &app),
            Command::Version => commands::version::run(&app),
        }
    }
}
