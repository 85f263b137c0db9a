//! Types for the format module.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::FormatError;

/// Codec identifier of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodecId {
    /// Uncompressed linear PCM.
    LinearPcm {
        /// IEEE floating point samples.
        float: bool,
        /// Most significant byte first.
        big_endian: bool,
        /// Two's complement integers (ignored for float).
        signed: bool,
    },
    /// ITU-T G.711 μ-law.
    MuLaw,
    /// ITU-T G.711 A-law.
    ALaw,
    /// IMA/DVI ADPCM, WAV block layout.
    ImaAdpcm,
}

impl CodecId {
    /// Signed little-endian integer PCM.
    pub const PCM_SIGNED_LE: CodecId = CodecId::LinearPcm {
        float: false,
        big_endian: false,
        signed: true,
    };

    /// Short lowercase name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LinearPcm { float: true, .. } => "float",
            Self::LinearPcm { signed: false, .. } => "pcm_unsigned",
            Self::LinearPcm { .. } => "pcm",
            Self::MuLaw => "ulaw",
            Self::ALaw => "alaw",
            Self::ImaAdpcm => "ima_adpcm",
        }
    }

    /// Whether this is uncompressed linear PCM.
    pub fn is_linear(&self) -> bool {
        matches!(self, Self::LinearPcm { .. })
    }
}

/// Speaker arrangement of a multichannel stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayoutTag {
    Mono,
    Stereo,
    Quadraphonic,
    Surround51,
    Surround71,
}

impl ChannelLayoutTag {
    /// Number of channels this layout implies.
    pub fn channel_count(&self) -> u32 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Quadraphonic => 4,
            Self::Surround51 => 6,
            Self::Surround71 => 8,
        }
    }

    /// WAVE_FORMAT_EXTENSIBLE speaker mask for this layout.
    pub fn speaker_mask(&self) -> u32 {
        match self {
            Self::Mono => 0x4,
            Self::Stereo => 0x3,
            Self::Quadraphonic => 0x33,
            Self::Surround51 => 0x3F,
            Self::Surround71 => 0x63F,
        }
    }

    /// Maps a WAVE_FORMAT_EXTENSIBLE speaker mask back to a layout, if known.
    pub fn from_speaker_mask(mask: u32) -> Option<Self> {
        match mask {
            0x4 => Some(Self::Mono),
            0x3 => Some(Self::Stereo),
            0x33 => Some(Self::Quadraphonic),
            0x3F | 0x60F => Some(Self::Surround51),
            0x63F | 0xFF => Some(Self::Surround71),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelLayoutTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mono => "mono",
            Self::Stereo => "stereo",
            Self::Quadraphonic => "quad",
            Self::Surround51 => "5.1",
            Self::Surround71 => "7.1",
        };
        f.write_str(name)
    }
}

/// Sample layout of one audio stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Frames per second.
    pub sample_rate: f64,
    /// Channels per frame.
    pub channels: u32,
    /// Bits per channel sample; 0 for variable bit rate codecs.
    pub bits_per_channel: u32,
    /// Bytes per packet; 0 when packets vary in size.
    pub bytes_per_packet: u32,
    /// Frames grouped into one packet.
    pub frames_per_packet: u32,
    /// Codec of the packet payload.
    pub codec: CodecId,
    /// Optional speaker arrangement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_layout: Option<ChannelLayoutTag>,
}

impl FormatDescriptor {
    /// Signed little-endian integer PCM.
    pub fn linear_pcm(sample_rate: f64, channels: u32, bits_per_channel: u32) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_channel,
            bytes_per_packet: bits_per_channel / 8 * channels,
            frames_per_packet: 1,
            codec: CodecId::PCM_SIGNED_LE,
            channel_layout: None,
        }
    }

    /// Little-endian IEEE float PCM (32 or 64 bits).
    pub fn float_pcm(sample_rate: f64, channels: u32, bits_per_channel: u32) -> Self {
        Self {
            codec: CodecId::LinearPcm {
                float: true,
                big_endian: false,
                signed: true,
            },
            ..Self::linear_pcm(sample_rate, channels, bits_per_channel)
        }
    }

    /// G.711 μ-law, one byte per channel sample.
    pub fn mu_law(sample_rate: f64, channels: u32) -> Self {
        Self {
            codec: CodecId::MuLaw,
            ..Self::linear_pcm(sample_rate, channels, 8)
        }
    }

    /// G.711 A-law, one byte per channel sample.
    pub fn a_law(sample_rate: f64, channels: u32) -> Self {
        Self {
            codec: CodecId::ALaw,
            ..Self::linear_pcm(sample_rate, channels, 8)
        }
    }

    /// IMA ADPCM with `frames_per_packet` frames per block (must be `1 + 8k`).
    pub fn ima_adpcm(sample_rate: f64, channels: u32, frames_per_packet: u32) -> Self {
        let nibble_bytes = frames_per_packet.saturating_sub(1) / 2;
        Self {
            sample_rate,
            channels,
            bits_per_channel: 4,
            bytes_per_packet: (4 + nibble_bytes) * channels,
            frames_per_packet,
            codec: CodecId::ImaAdpcm,
            channel_layout: None,
        }
    }

    /// Switches a linear PCM descriptor to big-endian byte order.
    pub fn with_big_endian(mut self, big_endian: bool) -> Self {
        if let CodecId::LinearPcm { float, signed, .. } = self.codec {
            self.codec = CodecId::LinearPcm {
                float,
                big_endian,
                signed,
            };
        }
        self
    }

    /// Switches an integer PCM descriptor to unsigned (offset binary) samples.
    pub fn with_unsigned(mut self) -> Self {
        if let CodecId::LinearPcm {
            float: false,
            big_endian,
            ..
        } = self.codec
        {
            self.codec = CodecId::LinearPcm {
                float: false,
                big_endian,
                signed: false,
            };
        }
        self
    }

    /// Attaches a channel layout tag.
    pub fn with_channel_layout(mut self, layout: ChannelLayoutTag) -> Self {
        self.channel_layout = Some(layout);
        self
    }

    /// Checks the descriptor invariants.
    pub fn validate(&self) -> Result<(), FormatError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(FormatError::InvalidSampleRate {
                rate: self.sample_rate,
            });
        }
        if self.channels == 0 {
            return Err(FormatError::ZeroChannels);
        }
        if self.frames_per_packet == 0 {
            return Err(FormatError::ZeroFramesPerPacket);
        }
        if self.codec.is_linear() && self.bytes_per_packet != 0 {
            let expected = u64::from(self.bits_per_channel) / 8
                * u64::from(self.channels)
                * u64::from(self.frames_per_packet);
            if u64::from(self.bytes_per_packet) != expected {
                return Err(FormatError::InconsistentPacketSize {
                    declared: self.bytes_per_packet,
                    expected,
                });
            }
        }
        if let Some(layout) = self.channel_layout {
            if layout.channel_count() != self.channels {
                return Err(FormatError::LayoutMismatch {
                    layout: layout.to_string(),
                    expected: layout.channel_count(),
                    actual: self.channels,
                });
            }
        }
        Ok(())
    }

    /// Whether [`validate`](Self::validate) succeeds.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Whether samples can be copied between the two streams without conversion.
    pub fn is_directly_compatible(&self, other: &FormatDescriptor) -> bool {
        self == other
    }

    /// Whether the codec is uncompressed linear PCM.
    pub fn is_linear(&self) -> bool {
        self.codec.is_linear()
    }

    /// Whether packets group more than one frame.
    pub fn is_compressed(&self) -> bool {
        self.frames_per_packet > 1
    }

    /// Bytes per frame for constant-size packets holding one frame.
    pub fn bytes_per_frame(&self) -> Option<u32> {
        if self.bytes_per_packet == 0 || self.frames_per_packet != 1 {
            return None;
        }
        Some(self.bytes_per_packet)
    }

    /// Human readable one-line summary.
    pub fn describe(&self) -> String {
        let mut text = format!(
            "{} {} Hz, {} ch",
            self.codec.name(),
            self.sample_rate,
            self.channels
        );
        if self.bits_per_channel > 0 {
            text.push_str(&format!(", {} bit", self.bits_per_channel));
        }
        if let CodecId::LinearPcm {
            big_endian: true, ..
        } = self.codec
        {
            text.push_str(", BE");
        }
        if self.frames_per_packet > 1 {
            text.push_str(&format!(", {} frames/packet", self.frames_per_packet));
        }
        if let Some(layout) = self.channel_layout {
            text.push_str(&format!(", {}", layout));
        }
        text
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_pcm_is_valid() {
        let format = FormatDescriptor::linear_pcm(44_100.0, 2, 16);
        assert!(format.is_valid());
        assert_eq!(format.bytes_per_packet, 4);
        assert_eq!(format.bytes_per_frame(), Some(4));
        assert!(!format.is_compressed());
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        let format = FormatDescriptor::linear_pcm(0.0, 2, 16);
        assert!(matches!(
            format.validate(),
            Err(FormatError::InvalidSampleRate { .. })
        ));

        let nan = FormatDescriptor::linear_pcm(f64::NAN, 2, 16);
        assert!(!nan.is_valid());
    }

    #[test]
    fn test_rejects_zero_channels() {
        let format = FormatDescriptor::linear_pcm(8_000.0, 0, 16);
        assert_eq!(format.validate(), Err(FormatError::ZeroChannels));
    }

    #[test]
    fn test_rejects_zero_frames_per_packet() {
        let mut format = FormatDescriptor::linear_pcm(8_000.0, 1, 16);
        format.frames_per_packet = 0;
        assert_eq!(format.validate(), Err(FormatError::ZeroFramesPerPacket));
    }

    #[test]
    fn test_rejects_inconsistent_linear_packet_size() {
        let mut format = FormatDescriptor::linear_pcm(48_000.0, 2, 24);
        format.bytes_per_packet = 4;
        assert!(matches!(
            format.validate(),
            Err(FormatError::InconsistentPacketSize {
                declared: 4,
                expected: 6
            })
        ));

        // Zero means "variable" and is not checked.
        format.bytes_per_packet = 0;
        assert!(format.is_valid());
    }

    #[test]
    fn test_rejects_layout_mismatch() {
        let format =
            FormatDescriptor::linear_pcm(48_000.0, 2, 16).with_channel_layout(ChannelLayoutTag::Mono);
        assert!(matches!(
            format.validate(),
            Err(FormatError::LayoutMismatch { expected: 1, .. })
        ));
    }

    #[test]
    fn test_ima_adpcm_packet_size() {
        let mono = FormatDescriptor::ima_adpcm(22_050.0, 1, 505);
        assert_eq!(mono.bytes_per_packet, 256);
        let stereo = FormatDescriptor::ima_adpcm(44_100.0, 2, 1017);
        assert_eq!(stereo.bytes_per_packet, 1024);
        assert!(stereo.is_valid());
        assert!(stereo.is_compressed());
        assert_eq!(stereo.bytes_per_frame(), None);
    }

    #[test]
    fn test_direct_compatibility_requires_every_field() {
        let a = FormatDescriptor::linear_pcm(44_100.0, 2, 16);
        let b = a.clone();
        assert!(a.is_directly_compatible(&b));

        let big = a.clone().with_big_endian(true);
        assert!(!a.is_directly_compatible(&big));

        let tagged = a.clone().with_channel_layout(ChannelLayoutTag::Stereo);
        assert!(!a.is_directly_compatible(&tagged));
    }

    #[test]
    fn test_with_unsigned_only_touches_integer_pcm() {
        let pcm = FormatDescriptor::linear_pcm(8_000.0, 1, 8).with_unsigned();
        assert_eq!(
            pcm.codec,
            CodecId::LinearPcm {
                float: false,
                big_endian: false,
                signed: false
            }
        );
        let float = FormatDescriptor::float_pcm(8_000.0, 1, 32).with_unsigned();
        assert!(matches!(float.codec, CodecId::LinearPcm { float: true, .. }));
    }

    #[test]
    fn test_speaker_mask_round_trip() {
        for layout in [
            ChannelLayoutTag::Mono,
            ChannelLayoutTag::Stereo,
            ChannelLayoutTag::Quadraphonic,
            ChannelLayoutTag::Surround51,
            ChannelLayoutTag::Surround71,
        ] {
            assert_eq!(
                ChannelLayoutTag::from_speaker_mask(layout.speaker_mask()),
                Some(layout)
            );
        }
        assert_eq!(ChannelLayoutTag::from_speaker_mask(0x1234), None);
    }

    #[test]
    fn test_describe() {
        let format = FormatDescriptor::linear_pcm(44_100.0, 2, 16).with_big_endian(true);
        assert_eq!(format.describe(), "pcm 44100 Hz, 2 ch, 16 bit, BE");
    }

    #[test]
    fn test_serialization() {
        let format = FormatDescriptor::ima_adpcm(22_050.0, 1, 505);
        let json = serde_json::to_string(&format).unwrap();
        assert!(json.contains("\"kind\":\"ima_adpcm\""));
        let parsed: FormatDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, format);
    }
}
