//! Plasmic CLI
//!
//! Syncs components designed in Plasmic into a local codebase.

mod cli;
mod commands;
mod error;
mod http;
mod interactive;

use std::error::Error as _;
use std::io;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        if !e.is_handled() {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  {} {}", "caused by:".dimmed(), cause);
                source = cause.source();
            }
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} Plasmic CLI", "plasmic".green().bold());
            println!();
            println!("Run {} for available commands.", "plasmic --help".cyan());
            Ok(())
        }
    }
}

/// `-v` logs everything at DEBUG; otherwise `RUST_LOG` decides, falling
/// back to warnings only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(io::stderr)
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

fn execute_command(cmd: Commands) -> Result<()> {
    let cwd = std::env::current_dir()?;
    match cmd {
        Commands::Sync(args) => commands::run_sync(&cwd, &args),
        Commands::Auth {
            user,
            token,
            host,
            path,
        } => commands::run_auth(&cwd, &host, &user, &token, path.as_deref()).map(|_| ()),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "plasmic", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn test_unhandled_errors_are_flagged() {
        let error = CliError::from(io::Error::other("disk on fire"));
        assert!(!error.is_handled());
        assert_eq!(error.to_string(), "disk on fire");
    }
}
