//! The deployment procedure as an ordered plan.
//!
//! Shared by `hostprep deploy` and mirrored by the generated deploy script:
//! clone when the repository is missing, otherwise fetch, checkout and pull
//! (never reset), then relink the environment file, install dependencies and
//! replace the supervised process.

use std::path::PathBuf;

use crate::domain::config::ProvisionConfig;

/// A command in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Abort the remaining plan when this command fails.
    pub abort_on_failure: bool,
    /// A failure is expected and not reported (e.g. deleting a process that
    /// is not running).
    pub ignore_failure: bool,
}

impl PlannedCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            abort_on_failure: false,
            ignore_failure: false,
        }
    }

    fn aborting(mut self) -> Self {
        self.abort_on_failure = true;
        self
    }

    fn ignoring_failure(mut self) -> Self {
        self.ignore_failure = true;
        self
    }

    /// Render as a single command line for logs.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One action of the deployment procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployAction {
    Run(PlannedCommand),
    /// Replace `link` with a symlink to `target`.
    LinkEnvFile { target: PathBuf, link: PathBuf },
}

/// Whether the plan clones or updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkout {
    Clone,
    Update,
}

/// Ordered deployment actions.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub checkout: Checkout,
    pub actions: Vec<DeployAction>,
}

impl DeployPlan {
    /// Build the plan. `repo_present` is whether `<repo_dir>/.git` exists.
    #[must_use]
    pub fn new(cfg: &ProvisionConfig, repo_present: bool) -> Self {
        let repo_dir = cfg.repo_dir.display().to_string();
        let branch = cfg.branch.as_str();
        let mut actions = Vec::new();

        let checkout = if repo_present {
            actions.push(DeployAction::Run(PlannedCommand::new(
                "git",
                &["-C", &repo_dir, "fetch", "origin"],
            )));
            actions.push(DeployAction::Run(
                PlannedCommand::new("git", &["-C", &repo_dir, "checkout", branch]).aborting(),
            ));
            actions.push(DeployAction::Run(PlannedCommand::new(
                "git",
                &["-C", &repo_dir, "pull", "origin", branch],
            )));
            Checkout::Update
        } else {
            actions.push(DeployAction::Run(
                PlannedCommand::new(
                    "git",
                    &["clone", "--branch", branch, &cfg.repo_url, &repo_dir],
                )
                .aborting(),
            ));
            Checkout::Clone
        };

        actions.push(DeployAction::LinkEnvFile {
            target: cfg.env_file.clone(),
            link: cfg.repo_dir.join(".env"),
        });
        actions.push(DeployAction::Run(PlannedCommand::new(
            "npm",
            &["install", "--production", "--prefix", &repo_dir],
        )));

        let entry = cfg.repo_dir.join(&cfg.entry_point).display().to_string();
        let instances = cfg.instances.to_string();
        actions.push(DeployAction::Run(
            PlannedCommand::new("pm2", &["delete", &cfg.process_name]).ignoring_failure(),
        ));
        actions.push(DeployAction::Run(
            PlannedCommand::new(
                "pm2",
                &[
                    "start",
                    &entry,
                    "--name",
                    &cfg.process_name,
                    "-i",
                    &instances,
                    "--cwd",
                    &repo_dir,
                ],
            )
            .aborting(),
        ));
        actions.push(DeployAction::Run(PlannedCommand::new("pm2", &["save"])));

        Self { checkout, actions }
    }

    /// Command lines of the plan, for display and tests.
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                DeployAction::Run(cmd) => Some(cmd.display()),
                DeployAction::LinkEnvFile { .. } => None,
            })
            .collect()
    }
}
