//! Auth command implementation

use std::path::Path;

use colored::Colorize;
use plasmic_core::config::auth::default_auth_path;
use plasmic_core::config::{AuthConfig, write_auth};
use plasmic_fs::NormalizedPath;

use crate::error::{CliError, Result};

/// Write `.plasmic.auth` with the given credentials.
///
/// Without `path` the file goes to the home directory, where every project
/// of the user finds it.
pub fn run_auth(cwd: &Path, host: &str, user: &str, token: &str, path: Option<&Path>) -> Result<NormalizedPath> {
    if user.trim().is_empty() || token.trim().is_empty() {
        return Err(CliError::user("Both --user and --token are required."));
    }

    let target = match path {
        Some(p) => NormalizedPath::new(cwd.join(p)),
        None => default_auth_path()
            .ok_or_else(|| CliError::user("Could not determine the home directory; pass --path."))?,
    };
    let auth = AuthConfig {
        host: host.trim_end_matches('/').to_string(),
        user: user.to_string(),
        token: token.to_string(),
    };
    write_auth(&target, &auth)?;

    println!("{} Credentials saved to {}", "OK".green().bold(), target.as_str().cyan());
    Ok(target)
}
