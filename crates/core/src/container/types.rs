//! Types for the container module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Container file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    /// RIFF WAVE
    Wav,
    /// Audio Interchange File Format
    Aiff,
    /// AIFF with compression types
    Aifc,
}

impl ContainerType {
    /// Returns the file extension for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Aiff => "aiff",
            Self::Aifc => "aifc",
        }
    }

    /// Maps a file extension (case-insensitive) to a container type.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(Self::Wav),
            "aif" | "aiff" => Some(Self::Aiff),
            "aifc" => Some(Self::Aifc),
            _ => None,
        }
    }

    /// Infers the container type from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether linear PCM in this container is stored big-endian.
    pub fn is_big_endian(&self) -> bool {
        !matches!(self, Self::Wav)
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Result of one packet read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketRead {
    /// Packets copied into the buffer.
    pub packets: u32,
    /// Audio frames those packets carry.
    pub frames: u32,
}

impl PacketRead {
    /// Whether the read hit the end of the stream.
    pub fn is_end_of_stream(&self) -> bool {
        self.packets == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_extension() {
        assert_eq!(ContainerType::from_extension("WAV"), Some(ContainerType::Wav));
        assert_eq!(ContainerType::from_extension("aif"), Some(ContainerType::Aiff));
        assert_eq!(ContainerType::from_extension("aifc"), Some(ContainerType::Aifc));
        assert_eq!(ContainerType::from_extension("mp3"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            ContainerType::from_path(&PathBuf::from("/music/take1.aiff")),
            Some(ContainerType::Aiff)
        );
        assert_eq!(ContainerType::from_path(&PathBuf::from("/music/take1")), None);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&ContainerType::Aifc).unwrap();
        assert_eq!(json, "\"aifc\"");
    }
}
