//! Error types for plasmic-core

use std::path::PathBuf;

/// Result type for plasmic-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while syncing
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Nothing was requested and nothing is tracked
    #[error("Don't know which projects to sync. Please specify via --projects")]
    NothingToSync,

    #[error("Invalid project spec '{spec}': {reason}")]
    InvalidProjectSpec { spec: String, reason: String },

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// A tracked file went missing and several files share its name
    #[error(
        "Cannot tell where {path} was moved: found {} candidates ({}). Please update plasmic.json by hand.",
        candidates.len(),
        candidates.join(", ")
    )]
    AmbiguousFileMove { path: String, candidates: Vec<String> },

    #[error("No Plasmic credentials found. Run `plasmic auth` or set PLASMIC_AUTH_USER and PLASMIC_AUTH_TOKEN.")]
    MissingAuth,

    #[error("Cannot write to {path}; file already exists.")]
    FileExists { path: String },

    #[error(
        "Cannot merge {path}: the base revision is unavailable. Pass --force-overwrite to replace the file, or --append-jsx-on-missing-base to keep both versions."
    )]
    MergeBaseUnavailable { component_id: String, path: String },

    #[error("Upgrading {package} to {required} is required to continue (running {current}).")]
    UpgradeRequired {
        package: String,
        required: String,
        current: String,
    },

    #[error("{path} was written by plasmic {found}, newer than this version ({current}). Please upgrade the CLI.")]
    ConfigTooNew {
        path: PathBuf,
        found: String,
        current: String,
    },

    #[error("{path} resolves outside the project root {root}")]
    PathOutsideRoot { path: String, root: String },

    #[error("{path} is missing. If you deleted this component, remember to remove the component from plasmic.json")]
    MissingComponentFile { component: String, path: String },

    #[error(
        "{file} imports {kind} {id}, which is not in plasmic.json. {hint}"
    )]
    MissingReference {
        file: String,
        kind: String,
        id: String,
        hint: String,
    },

    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("No plasmic.json found in {path} or any parent directory")]
    ConfigNotFound { path: PathBuf },

    // Resolution
    #[error("Unable to resolve project versions: {message}")]
    ResolutionFailed { message: String },

    #[error("Project {project_id} resolved to both {first} and {second}")]
    VersionConflict {
        project_id: String,
        first: String,
        second: String,
    },

    #[error("Dependency cycle between projects: {}", participants.join(", "))]
    DependencyCycle { participants: Vec<String> },

    #[error("Project {project_id} depends on {dependency}, which the server did not resolve")]
    UnresolvedDependency {
        project_id: String,
        dependency: String,
    },

    // External collaborators
    /// Error reported by the Plasmic server; callers may recover from it
    #[error("{message}")]
    AppServer { status: u16, message: String },

    #[error("The server sent a malformed bundle: {message}")]
    InvalidBundle { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Post-sync command `{command}` failed: {message}")]
    HookFailed { command: String, message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from plasmic-fs
    #[error(transparent)]
    Fs(#[from] plasmic_fs::Error),

    /// Source manipulation error from plasmic-code
    #[error(transparent)]
    Code(#[from] plasmic_code::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn app_server(status: u16, message: impl Into<String>) -> Self {
        Self::AppServer {
            status,
            message: message.into(),
        }
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::ResolutionFailed {
            message: message.into(),
        }
    }

    /// Whether this error is expected in normal use and deserves a clean
    /// one-line message instead of a failure report.
    pub fn is_handled(&self) -> bool {
        !matches!(
            self,
            Self::Fs(_) | Self::Code(_) | Self::Io(_) | Self::Json(_) | Self::Network { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_are_unexpected() {
        let io = Error::from(std::io::Error::other("boom"));
        assert!(!io.is_handled());
        assert!(Error::NothingToSync.is_handled());
        assert!(Error::app_server(404, "revision not found").is_handled());
    }

    #[test]
    fn ambiguous_move_lists_candidates() {
        let err = Error::AmbiguousFileMove {
            path: "Button.tsx".into(),
            candidates: vec!["a/Button.tsx".into(), "b/Button.tsx".into()],
        };
        assert!(err.to_string().contains("found 2 candidates (a/Button.tsx, b/Button.tsx)"));
    }
}
