//! Stream format descriptors.
//!
//! A [`FormatDescriptor`] describes the sample layout of one audio stream: its
//! sample rate, channel count, how many bits each channel sample occupies and how
//! frames are grouped into packets. Descriptors are plain values; they carry no
//! behavior beyond validation and a few derived sizes.
//!
//! # Example
//!
//! ```
//! use audioconv_core::format::{ChannelLayoutTag, FormatDescriptor};
//!
//! let cd = FormatDescriptor::linear_pcm(44_100.0, 2, 16)
//!     .with_channel_layout(ChannelLayoutTag::Stereo);
//! assert!(cd.is_valid());
//! assert_eq!(cd.bytes_per_frame(), Some(4));
//!
//! let adpcm = FormatDescriptor::ima_adpcm(22_050.0, 1, 505);
//! assert_eq!(adpcm.bytes_per_packet, 256);
//! ```

mod error;
mod types;

pub use error::FormatError;
pub use types::{ChannelLayoutTag, CodecId, FormatDescriptor};
