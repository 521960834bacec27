//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for terminal-based confirmation.

use std::io::IsTerminal;

use dialoguer::Confirm;
use plasmic_core::Confirmer;

/// Asks sync questions on the terminal.
///
/// Falls back to the default answer when stdin is not a terminal, so piped
/// and CI runs never block.
#[derive(Debug, Default)]
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, message: &str, default: bool) -> plasmic_core::Result<bool> {
        if !std::io::stdin().is_terminal() {
            tracing::debug!(message, default, "no terminal, using default answer");
            return Ok(default);
        }
        Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(|e| plasmic_core::Error::from(std::io::Error::other(e)))
    }
}
