//! Error types for the container module.

use thiserror::Error;

/// Errors raised by container backends.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The container or its stream format is not supported by the backend.
    #[error("Unsupported container format: {reason}")]
    Unsupported { reason: String },

    /// The container structure could not be parsed.
    #[error("Malformed container: {reason}")]
    Malformed { reason: String },

    /// Reading or writing the underlying file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContainerError {
    /// Creates an unsupported format error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    /// Creates a malformed container error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}
