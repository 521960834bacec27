//! Error types for plasmic-code

use std::ops::Range;

/// Result type for plasmic-code operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in plasmic-code operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to parse {language} source: {message}")]
    ParseError { language: String, message: String },

    #[error("Failed to load {language} grammar: {message}")]
    Grammar { language: String, message: String },

    #[error("Edits overlap at range {0:?}")]
    OverlappingEdits(Range<usize>),

    #[error("Edit range {range:?} is outside a source of {len} bytes")]
    EditOutOfBounds { range: Range<usize>, len: usize },
}

impl Error {
    pub fn parse(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            language: language.into(),
            message: message.into(),
        }
    }
}
