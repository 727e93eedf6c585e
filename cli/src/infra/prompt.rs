//! Interactive terminal prompts backed by `dialoguer`.

use anyhow::{Context, Result};
use owo_colors::OwoColorize as _;

use crate::application::ports::{KeyRegistrationGate, LauncherPrompt};

/// Asks launcher questions on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompt;

impl LauncherPrompt for DialoguerPrompt {
    fn ask(&self, question: &str, default: Option<&str>) -> Result<String> {
        let mut input = dialoguer::Input::<String>::new().with_prompt(question);
        match default {
            Some(value) => input = input.default(value.to_string()),
            None => input = input.allow_empty(false),
        }
        input.interact_text().context("reading answer from terminal")
    }
}

/// Shows the public key and waits for the operator to confirm it has been
/// added to the git host.
///
/// When `non_interactive` (`--yes` or `CI`), the key is printed and the
/// registration is taken as confirmed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalGate {
    pub non_interactive: bool,
}

impl KeyRegistrationGate for TerminalGate {
    fn confirm_registration(&self, public_key: &str, git_host: &str) -> Result<bool> {
        print_key(public_key, git_host);
        if self.non_interactive {
            tracing::warn!(%git_host, "deploy key registration confirmed without prompting");
            return Ok(true);
        }
        dialoguer::Confirm::new()
            .with_prompt(format!("Deploy key added to {git_host}?"))
            .default(true)
            .interact()
            .context("waiting for deploy key confirmation (no terminal?)")
    }
}

fn print_key(public_key: &str, git_host: &str) {
    println!();
    println!("  Add this deploy key to the repository on {git_host}:");
    println!();
    println!("    {}", public_key.bold());
    println!();
}
