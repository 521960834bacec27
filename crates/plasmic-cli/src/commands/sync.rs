//! Sync command implementation
//!
//! Wires the terminal (credentials, prompts, output) to the core
//! [`SyncEngine`].

use std::path::Path;

use colored::Colorize;
use plasmic_core::config::load_auth;
use plasmic_core::config::AuthSource;
use plasmic_core::{AssumeDefaults, Confirmer, ProjectSpec, SyncEngine, SyncOptions, SyncReport};
use plasmic_fs::NormalizedPath;

use crate::cli::SyncArgs;
use crate::error::Result;
use crate::http::HttpApi;
use crate::interactive::TerminalConfirmer;

/// Translate command-line arguments into engine options.
pub fn sync_options(cwd: &Path, args: &SyncArgs) -> Result<SyncOptions> {
    let mut options = SyncOptions::new(cwd);
    options.config_path = args.config.as_ref().map(|p| NormalizedPath::new(cwd.join(p)));
    options.projects = args
        .projects
        .iter()
        .map(|spec| ProjectSpec::parse(spec))
        .collect::<plasmic_core::Result<_>>()?;
    options.components = args.components.clone();
    options.force = args.force;
    options.force_overwrite = args.force_overwrite;
    options.recursive = args.is_recursive();
    options.new_component_scheme = args.new_component_scheme.map(Into::into);
    options.append_jsx_on_missing_base = args.append_jsx_on_missing_base;
    options.ignore_post_sync = args.ignore_post_sync;
    options.skip_upgrade_check = args.skip_upgrade_check;
    options.skip_buffering = args.skip_buffering;
    Ok(options)
}

/// Run the sync command
pub fn run_sync(cwd: &Path, args: &SyncArgs) -> Result<()> {
    let options = sync_options(cwd, args)?;

    let explicit_auth = args.auth.as_ref().map(|p| NormalizedPath::new(cwd.join(p)));
    let home = dirs::home_dir().map(NormalizedPath::new);
    let (auth, source) = load_auth(
        explicit_auth.as_ref(),
        &NormalizedPath::new(cwd),
        home.as_ref(),
        |key| std::env::var(key).ok(),
    )?;
    match &source {
        AuthSource::Environment => tracing::debug!("using credentials from the environment"),
        AuthSource::File(path) => tracing::debug!(path = %path, "using credentials file"),
    }

    println!("{} Syncing Plasmic projects...", "=>".blue().bold());

    let api = HttpApi::new(auth);
    let terminal = TerminalConfirmer;
    let confirmer: &dyn Confirmer = if args.non_interactive {
        &AssumeDefaults
    } else {
        &terminal
    };
    let report = SyncEngine::new(&api, confirmer).sync(&options)?;

    print_report(&report);
    Ok(())
}

/// Print what a sync did.
pub fn print_report(report: &SyncReport) {
    for action in &report.actions {
        println!("   {} {}", "+".green(), action);
    }
    for warning in &report.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }
    for hook in &report.hooks {
        println!("   {} {}", "$".dimmed(), hook.command.cyan());
        let stdout = hook.stdout.trim_end();
        if !stdout.is_empty() {
            println!("{stdout}");
        }
    }

    if report.up_to_date {
        println!("{} Everything is up to date.", "OK".green().bold());
        return;
    }
    println!(
        "{} Synced {} project(s): {} file(s) written, {} deleted.",
        "OK".green().bold(),
        report.synced.len(),
        report.files_written(),
        report.files_deleted()
    );
}
