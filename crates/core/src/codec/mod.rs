//! Sample codecs.
//!
//! Codecs translate between packet payloads and interleaved, normalized `f64`
//! samples in `[-1.0, 1.0)`. Every conversion goes through that representation,
//! which holds 32-bit integers and 32/64-bit floats without loss.
//!
//! Supported codecs:
//!
//! - Linear PCM: signed or unsigned 8/16/24/32-bit integers, 32/64-bit floats,
//!   either byte order
//! - G.711 μ-law and A-law
//! - IMA ADPCM in the WAV block layout (several frames per packet)

mod error;
mod g711;
mod ima_adpcm;
mod pcm;
mod traits;

pub use error::CodecError;
pub use g711::{alaw_to_linear, linear_to_alaw, linear_to_ulaw, ulaw_to_linear};
pub use traits::{EncodedBatch, PacketDecoder, PacketEncoder};

use crate::format::{CodecId, FormatDescriptor};

/// Checks the codec-specific constraints of a descriptor.
pub fn check_supported(format: &FormatDescriptor) -> Result<(), CodecError> {
    match format.codec {
        CodecId::LinearPcm { float, .. } => {
            let bits_ok = if float {
                matches!(format.bits_per_channel, 32 | 64)
            } else {
                matches!(format.bits_per_channel, 8 | 16 | 24 | 32)
            };
            if !bits_ok {
                return Err(CodecError::unsupported(format!(
                    "{} bits per channel is not supported for {}",
                    format.bits_per_channel,
                    format.codec.name()
                )));
            }
            require_single_frame_packets(format)?;
            require_packet_size(format, format.bits_per_channel / 8 * format.channels)
        }
        CodecId::MuLaw | CodecId::ALaw => {
            if format.bits_per_channel != 8 {
                return Err(CodecError::unsupported(format!(
                    "G.711 requires 8 bits per channel, got {}",
                    format.bits_per_channel
                )));
            }
            require_single_frame_packets(format)?;
            require_packet_size(format, format.channels)
        }
        CodecId::ImaAdpcm => {
            if format.bits_per_channel != 4 {
                return Err(CodecError::unsupported(format!(
                    "IMA ADPCM requires 4 bits per channel, got {}",
                    format.bits_per_channel
                )));
            }
            if format.frames_per_packet == 0 || (format.frames_per_packet - 1) % 8 != 0 {
                return Err(CodecError::unsupported(format!(
                    "IMA ADPCM frames per packet must be 1 + 8k, got {}",
                    format.frames_per_packet
                )));
            }
            require_packet_size(
                format,
                ima_adpcm::block_size(format.channels, format.frames_per_packet),
            )
        }
    }
}

/// Builds a decoder for packets of `format`.
pub fn decoder_for(format: &FormatDescriptor) -> Result<Box<dyn PacketDecoder>, CodecError> {
    check_supported(format)?;
    Ok(match format.codec {
        CodecId::LinearPcm { .. } => Box::new(pcm::PcmDecoder::new(format)),
        CodecId::MuLaw => Box::new(g711::G711Decoder::new(format, g711::Law::Mu)),
        CodecId::ALaw => Box::new(g711::G711Decoder::new(format, g711::Law::A)),
        CodecId::ImaAdpcm => Box::new(ima_adpcm::ImaAdpcmDecoder::new(format)),
    })
}

/// Builds an encoder producing packets of `format`.
pub fn encoder_for(format: &FormatDescriptor) -> Result<Box<dyn PacketEncoder>, CodecError> {
    check_supported(format)?;
    Ok(match format.codec {
        CodecId::LinearPcm { .. } => Box::new(pcm::PcmEncoder::new(format)),
        CodecId::MuLaw => Box::new(g711::G711Encoder::new(format, g711::Law::Mu)),
        CodecId::ALaw => Box::new(g711::G711Encoder::new(format, g711::Law::A)),
        CodecId::ImaAdpcm => Box::new(ima_adpcm::ImaAdpcmEncoder::new(format)),
    })
}

fn require_single_frame_packets(format: &FormatDescriptor) -> Result<(), CodecError> {
    if format.frames_per_packet != 1 {
        return Err(CodecError::unsupported(format!(
            "{} carries one frame per packet, got {}",
            format.codec.name(),
            format.frames_per_packet
        )));
    }
    Ok(())
}

fn require_packet_size(format: &FormatDescriptor, expected: u32) -> Result<(), CodecError> {
    if format.bytes_per_packet != expected {
        return Err(CodecError::unsupported(format!(
            "{} with {} channels needs {} bytes per packet, got {}",
            format.codec.name(),
            format.channels,
            expected,
            format.bytes_per_packet
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_supported_accepts_constructors() {
        for format in [
            FormatDescriptor::linear_pcm(44_100.0, 2, 16),
            FormatDescriptor::linear_pcm(48_000.0, 6, 24).with_big_endian(true),
            FormatDescriptor::linear_pcm(8_000.0, 1, 8).with_unsigned(),
            FormatDescriptor::float_pcm(96_000.0, 2, 64),
            FormatDescriptor::mu_law(8_000.0, 1),
            FormatDescriptor::a_law(8_000.0, 2),
            FormatDescriptor::ima_adpcm(22_050.0, 2, 505),
        ] {
            assert!(check_supported(&format).is_ok(), "{}", format);
        }
    }

    #[test]
    fn test_check_supported_rejects_odd_depths() {
        let twelve = FormatDescriptor::linear_pcm(44_100.0, 2, 12);
        assert!(matches!(
            check_supported(&twelve),
            Err(CodecError::Unsupported { .. })
        ));

        let float16 = FormatDescriptor::float_pcm(44_100.0, 2, 16);
        assert!(check_supported(&float16).is_err());
    }

    #[test]
    fn test_check_supported_rejects_bad_adpcm_block() {
        let format = FormatDescriptor::ima_adpcm(22_050.0, 1, 500);
        assert!(check_supported(&format).is_err());

        let mut format = FormatDescriptor::ima_adpcm(22_050.0, 1, 505);
        format.bytes_per_packet = 255;
        assert!(check_supported(&format).is_err());
    }

    #[test]
    fn test_check_supported_rejects_variable_linear_packets() {
        let mut format = FormatDescriptor::linear_pcm(44_100.0, 2, 16);
        format.bytes_per_packet = 0;
        assert!(check_supported(&format).is_err());
    }
}
