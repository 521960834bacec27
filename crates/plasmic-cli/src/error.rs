//! Error types for plasmic-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from plasmic-core
    #[error(transparent)]
    Core(#[from] plasmic_core::Error),

    /// Error from plasmic-fs
    #[error(transparent)]
    Fs(#[from] plasmic_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Interactive prompt error
    #[error("Interactive prompt error: {0}")]
    Dialoguer(#[from] dialoguer::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Whether this is an anticipated failure with an actionable message.
    ///
    /// Anything else is reported as an unexpected crash, with its causes.
    pub fn is_handled(&self) -> bool {
        match self {
            Self::Core(e) => e.is_handled(),
            Self::User { .. } => true,
            Self::Fs(_) | Self::Io(_) | Self::Dialoguer(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_displays_message() {
        let error = CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
        assert!(error.is_handled());
    }

    #[test]
    fn test_core_errors_keep_their_classification() {
        assert!(CliError::from(plasmic_core::Error::NothingToSync).is_handled());
        assert!(!CliError::from(std::io::Error::other("boom")).is_handled());
    }
}
