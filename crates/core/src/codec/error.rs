//! Error types for the codec module.

use thiserror::Error;

/// Errors raised while decoding or encoding packets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The codec or its parameters are not supported.
    #[error("Unsupported codec configuration: {reason}")]
    Unsupported { reason: String },

    /// Packet payload does not match the declared layout.
    #[error("Corrupt packet data: {reason}")]
    Corrupt { reason: String },
}

impl CodecError {
    /// Creates an unsupported configuration error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    /// Creates a corrupt data error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }
}
