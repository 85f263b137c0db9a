//! Error types for the format module.

use thiserror::Error;

/// Reasons a [`FormatDescriptor`](super::FormatDescriptor) fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// Sample rate is zero, negative or not finite.
    #[error("Invalid sample rate: {rate}")]
    InvalidSampleRate { rate: f64 },

    /// Channel count is zero.
    #[error("Channel count must be greater than 0")]
    ZeroChannels,

    /// Frames per packet is zero.
    #[error("Frames per packet must be at least 1")]
    ZeroFramesPerPacket,

    /// Declared bytes per packet disagrees with the linear PCM layout.
    #[error("Bytes per packet {declared} does not match linear layout (expected {expected})")]
    InconsistentPacketSize { declared: u32, expected: u64 },

    /// Channel layout tag implies a different channel count.
    #[error("Channel layout {layout} implies {expected} channels, descriptor has {actual}")]
    LayoutMismatch {
        layout: String,
        expected: u32,
        actual: u32,
    },
}
