//! Error types for the endpoint module.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::container::ContainerError;
use crate::format::FormatError;

/// Coarse failure category shared by endpoint and engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    UnsupportedFormat,
    InvalidFormat,
    Io,
    Closed,
    Cancelled,
    Timeout,
    InvalidPacket,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not_found",
            Self::UnsupportedFormat => "unsupported_format",
            Self::InvalidFormat => "invalid_format",
            Self::Io => "io",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::InvalidPacket => "invalid_packet",
        };
        f.write_str(name)
    }
}

/// Errors raised by a [`StreamEndpoint`](super::StreamEndpoint).
///
/// I/O failures are captured as kind plus message so the error can be cloned
/// and re-raised by a failed engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// The input path does not exist.
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// The container is unrecognised or cannot carry the format.
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// The declared format violates descriptor invariants.
    #[error("Invalid format: {reason}")]
    InvalidFormat { reason: String },

    /// Reading or writing the file failed.
    #[error("I/O error ({kind:?}): {message}")]
    Io { kind: io::ErrorKind, message: String },

    /// The endpoint has been closed.
    #[error("Endpoint is closed")]
    Closed,

    /// Read on an output endpoint or write on an input endpoint.
    #[error("Cannot {operation} on an {role} endpoint")]
    WrongRole {
        operation: &'static str,
        role: &'static str,
    },

    /// Packet payload does not match the declared packet count.
    #[error("Invalid packet data: {reason}")]
    InvalidPacket { reason: String },
}

impl EndpointError {
    /// Creates an unsupported format error.
    pub fn unsupported_format(reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            reason: reason.into(),
        }
    }

    /// Creates an invalid packet error.
    pub fn invalid_packet(reason: impl Into<String>) -> Self {
        Self::InvalidPacket {
            reason: reason.into(),
        }
    }

    /// Creates an I/O error from a kind and message.
    pub fn io(kind: io::ErrorKind, message: impl Into<String>) -> Self {
        Self::Io {
            kind,
            message: message.into(),
        }
    }

    /// Returns the failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            Self::Io { .. } => ErrorKind::Io,
            Self::Closed | Self::WrongRole { .. } => ErrorKind::Closed,
            Self::InvalidPacket { .. } => ErrorKind::InvalidPacket,
        }
    }

    /// Whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

impl From<io::Error> for EndpointError {
    fn from(err: io::Error) -> Self {
        Self::io(err.kind(), err.to_string())
    }
}

impl From<FormatError> for EndpointError {
    fn from(err: FormatError) -> Self {
        Self::InvalidFormat {
            reason: err.to_string(),
        }
    }
}

impl From<ContainerError> for EndpointError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::Io(e) => e.into(),
            ContainerError::Unsupported { reason } => Self::UnsupportedFormat { reason },
            ContainerError::Malformed { reason } => Self::UnsupportedFormat { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_errors_map_to_kinds() {
        let err: EndpointError = ContainerError::malformed("missing fmt chunk").into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

        let err: EndpointError =
            ContainerError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "short read")).into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(
            err,
            EndpointError::Io {
                kind: io::ErrorKind::UnexpectedEof,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_format_error_is_invalid_format() {
        let err: EndpointError = FormatError::ZeroChannels.into();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = EndpointError::WrongRole {
            operation: "write packets",
            role: "input",
        };
        assert_eq!(err.to_string(), "Cannot write packets on an input endpoint");
        assert_eq!(ErrorKind::InvalidPacket.to_string(), "invalid_packet");
    }
}
