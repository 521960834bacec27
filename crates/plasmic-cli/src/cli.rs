//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use plasmic_core::config::ComponentScheme;

/// Plasmic - Sync generated component code into your codebase
#[derive(Parser, Debug)]
#[command(name = "plasmic")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Sync designs from Plasmic into the codebase
    ///
    /// Without --projects, every project tracked in plasmic.json is synced.
    ///
    /// Examples:
    ///   plasmic sync                          # Sync tracked projects
    ///   plasmic sync -p abc123                # Add or sync one project
    ///   plasmic sync -p abc123@^2.0.0 --yes   # Pin a range, no prompts
    Sync(SyncArgs),

    /// Store credentials for the Plasmic server
    ///
    /// Writes a .plasmic.auth file, in the home directory unless --path is given.
    Auth {
        /// Account email
        #[arg(long, env = "PLASMIC_AUTH_USER")]
        user: String,

        /// Personal API token
        #[arg(long, env = "PLASMIC_AUTH_TOKEN", hide_env_values = true)]
        token: String,

        /// Plasmic server
        #[arg(long, env = "PLASMIC_AUTH_HOST", default_value = plasmic_core::config::auth::DEFAULT_HOST)]
        host: String,

        /// Where to write the auth file
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   plasmic completions bash > ~/.local/share/bash-completion/completions/plasmic
    ///   plasmic completions zsh > ~/.zfunc/_plasmic
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncArgs {
    /// Projects to sync, as <projectId>[:<token>][@<versionRange>]
    #[arg(short, long, num_args = 1..)]
    pub projects: Vec<String>,

    /// Only sync these components (ids or names)
    #[arg(short, long, num_args = 1..)]
    pub components: Vec<String>,

    /// Sync even if the local version is already up to date
    #[arg(long)]
    pub force: bool,

    /// Overwrite skeleton files that cannot be merged
    #[arg(long)]
    pub force_overwrite: bool,

    /// Never prompt; every question takes its default answer
    #[arg(long, visible_alias = "yes")]
    pub non_interactive: bool,

    /// Sync dependencies too (default)
    #[arg(long, overrides_with = "non_recursive")]
    pub recursive: bool,

    /// Only sync the named projects, not their dependencies
    #[arg(long, overrides_with = "recursive")]
    pub non_recursive: bool,

    /// Scheme for components synced for the first time
    #[arg(long, value_enum)]
    pub new_component_scheme: Option<SchemeArg>,

    /// Keep local edits when no merge base is available, appending the new
    /// version as comments
    #[arg(long)]
    pub append_jsx_on_missing_base: bool,

    /// Do not run postSyncCommands
    #[arg(long)]
    pub ignore_post_sync: bool,

    /// Do not check for required package versions
    #[arg(long)]
    pub skip_upgrade_check: bool,

    /// Write each file as soon as it is produced
    #[arg(long)]
    pub skip_buffering: bool,

    /// Path to plasmic.json
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to .plasmic.auth
    #[arg(long)]
    pub auth: Option<PathBuf>,
}

impl SyncArgs {
    /// `--recursive` is the default; only `--non-recursive` turns it off.
    pub fn is_recursive(&self) -> bool {
        !self.non_recursive
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeArg {
    Blackbox,
    Direct,
}

impl From<SchemeArg> for ComponentScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Blackbox => ComponentScheme::Blackbox,
            SchemeArg::Direct => ComponentScheme::Direct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn sync_args(args: &[&str]) -> SyncArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Commands::Sync(args)) => args,
            other => panic!("Expected Sync command, got {other:?}"),
        }
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_no_command() {
        let cli = Cli::try_parse_from(["plasmic"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_sync_defaults() {
        let args = sync_args(&["plasmic", "sync"]);
        assert_eq!(args, SyncArgs::default());
        assert!(args.is_recursive());
    }

    #[test]
    fn parse_sync_projects() {
        let args = sync_args(&["plasmic", "sync", "--projects", "p1", "p2:tok@^1.0.0"]);
        assert_eq!(args.projects, vec!["p1", "p2:tok@^1.0.0"]);
    }

    #[test]
    fn parse_sync_flags() {
        let args = sync_args(&[
            "plasmic",
            "sync",
            "--force",
            "--force-overwrite",
            "--yes",
            "--append-jsx-on-missing-base",
            "--new-component-scheme",
            "direct",
            "-c",
            "Button",
        ]);
        assert!(args.force);
        assert!(args.force_overwrite);
        assert!(args.non_interactive);
        assert!(args.append_jsx_on_missing_base);
        assert_eq!(args.new_component_scheme, Some(SchemeArg::Direct));
        assert_eq!(args.components, vec!["Button"]);
    }

    #[test]
    fn parse_recursion_flags() {
        assert!(!sync_args(&["plasmic", "sync", "--non-recursive"]).is_recursive());
        assert!(sync_args(&["plasmic", "sync", "--non-recursive", "--recursive"]).is_recursive());
    }

    #[test]
    fn parse_rejects_unknown_scheme() {
        let result = Cli::try_parse_from(["plasmic", "sync", "--new-component-scheme", "plain"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["plasmic", "sync", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_auth_command() {
        let cli = Cli::try_parse_from([
            "plasmic",
            "auth",
            "--user",
            "me@example.com",
            "--token",
            "secret",
            "--host",
            "http://localhost:3003",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Auth {
                user,
                token,
                host,
                path,
            }) => {
                assert_eq!(user, "me@example.com");
                assert_eq!(token, "secret");
                assert_eq!(host, "http://localhost:3003");
                assert!(path.is_none());
            }
            other => panic!("Expected Auth command, got {other:?}"),
        }
    }

    #[test]
    fn parse_completions_command() {
        let cli = Cli::try_parse_from(["plasmic", "completions", "bash"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Completions { .. })));
    }
}
