//! Error types for the engine module.

use thiserror::Error;

use crate::codec::CodecError;
use crate::endpoint::{EndpointError, EndpointRole, ErrorKind};

/// Errors that end a conversion.
///
/// Cloneable so a failed engine can return the same error on every later call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// An endpoint operation failed.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// One of the endpoints was closed before the conversion started.
    #[error("The {role} endpoint is not open")]
    EndpointNotOpen { role: EndpointRole },

    /// No sample pipeline exists between the two formats.
    #[error("Unsupported conversion: {reason}")]
    UnsupportedFormat { reason: String },

    /// The cancellation flag was raised.
    #[error("Conversion cancelled")]
    Cancelled,

    /// The configured timeout elapsed.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

impl ConversionError {
    /// Creates an unsupported conversion error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            reason: reason.into(),
        }
    }

    /// Returns the failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Endpoint(e) => e.kind(),
            Self::EndpointNotOpen { .. } => ErrorKind::Closed,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Endpoint(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

impl From<CodecError> for ConversionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Unsupported { reason } => Self::UnsupportedFormat { reason },
            CodecError::Corrupt { reason } => {
                EndpointError::io(std::io::ErrorKind::InvalidData, reason).into()
            }
        }
    }
}
