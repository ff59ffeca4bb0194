//! Error types for the shared domain layer.

use thiserror::Error;

/// Result type alias using SateError.
pub type SateResult<T> = Result<T, SateError>;

/// Errors raised while building or interpreting acquisition tasks.
#[derive(Debug, Error)]
pub enum SateError {
    #[error("Band number out of range (1-16): {0}")]
    InvalidBand(u16),

    #[error("Invalid rapid-scan generation: {0}")]
    InvalidGeneration(u8),

    #[error("Not a rapid-scan nominal time: {0}")]
    NotNominal(String),

    #[error("Unrecognised path '{path}': {reason}")]
    UnparsablePath { path: String, reason: String },

    #[error("Grid shape mismatch: expected {expected} values, got {actual}")]
    GridShape { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SateError {
    pub(crate) fn path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SateError::UnparsablePath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
