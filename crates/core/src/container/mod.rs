//! Container backends for audio files.
//!
//! A backend parses the metadata of an existing file into a
//! [`FormatDescriptor`](crate::format::FormatDescriptor) plus packet totals, and
//! writes provisional headers for new files that are patched on finalize.
//!
//! # Supported containers
//!
//! - WAV (`RIFF`/`WAVE`), including `WAVE_FORMAT_EXTENSIBLE`
//! - AIFF and AIFF-C (`FORM`/`AIFF`, `FORM`/`AIFC`)
//!
//! # Example
//!
//! ```ignore
//! use audioconv_core::container::{backend_for, ContainerType};
//!
//! let backend = backend_for(ContainerType::Wav);
//! backend.check_format(&format)?;
//! let writer = backend.create_writer(File::create("out.wav")?, &format)?;
//! ```

mod aiff;
mod bytes;
mod cbr;
mod error;
mod traits;
mod types;
mod wav;

pub use aiff::AiffBackend;
pub use error::ContainerError;
pub use traits::{ContainerBackend, ContainerReader, ContainerWriter};
pub use types::{ContainerType, PacketRead};
pub use wav::WavBackend;

/// Bytes of a file header needed by [`detect`].
pub const SNIFF_LEN: usize = 12;

/// Returns every registered backend.
pub fn backends() -> Vec<Box<dyn ContainerBackend>> {
    vec![
        Box::new(WavBackend),
        Box::new(AiffBackend::aiff()),
        Box::new(AiffBackend::aifc()),
    ]
}

/// Returns the backend writing `container`.
pub fn backend_for(container: ContainerType) -> Box<dyn ContainerBackend> {
    match container {
        ContainerType::Wav => Box::new(WavBackend),
        ContainerType::Aiff => Box::new(AiffBackend::aiff()),
        ContainerType::Aifc => Box::new(AiffBackend::aifc()),
    }
}

/// Identifies the container from the first bytes of a file.
pub fn detect(header: &[u8]) -> Option<Box<dyn ContainerBackend>> {
    backends().into_iter().find(|backend| backend.sniff(header))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_for_matches_type() {
        for container in [ContainerType::Wav, ContainerType::Aiff, ContainerType::Aifc] {
            assert_eq!(backend_for(container).container_type(), container);
        }
    }

    #[test]
    fn test_detect() {
        let wav = detect(b"RIFF\x00\x00\x00\x00WAVE").map(|b| b.container_type());
        assert_eq!(wav, Some(ContainerType::Wav));

        let aifc = detect(b"FORM\x00\x00\x00\x00AIFC").map(|b| b.container_type());
        assert_eq!(aifc, Some(ContainerType::Aifc));

        assert!(detect(b"OggS\x00\x02\x00\x00\x00\x00\x00\x00").is_none());
        assert!(detect(b"").is_none());
    }
}
