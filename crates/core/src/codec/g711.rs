//! G.711 μ-law and A-law companding.

use crate::format::FormatDescriptor;

use super::error::CodecError;
use super::pcm::{from_i16, to_i16};
use super::traits::{EncodedBatch, PacketDecoder, PacketEncoder};

const ULAW_BIAS: i32 = 0x84;
const ULAW_CLIP: i32 = 32_635;

/// Segment end points for A-law, in 13-bit magnitude.
const ALAW_SEGMENT_END: [i32; 8] = [0x1F, 0x3F, 0x7F, 0xFF, 0x1FF, 0x3FF, 0x7FF, 0xFFF];

/// Companding law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Law {
    Mu,
    A,
}

/// Compresses a 16-bit linear sample to μ-law.
pub fn linear_to_ulaw(sample: i16) -> u8 {
    let mut pcm = i32::from(sample);
    let sign = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0x00
    };
    pcm = pcm.min(ULAW_CLIP) + ULAW_BIAS;

    let mut exponent = 7;
    let mut mask = 0x4000;
    while exponent > 0 && pcm & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = (pcm >> (exponent + 3)) & 0x0F;
    !((sign | (exponent << 4) | mantissa) as u8)
}

/// Expands a μ-law byte to a 16-bit linear sample.
pub fn ulaw_to_linear(byte: u8) -> i16 {
    let byte = !byte;
    let exponent = i32::from((byte >> 4) & 0x07);
    let mantissa = i32::from(byte & 0x0F);
    let magnitude = (((mantissa << 3) + ULAW_BIAS) << exponent) - ULAW_BIAS;
    if byte & 0x80 != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Compresses a 16-bit linear sample to A-law.
pub fn linear_to_alaw(sample: i16) -> u8 {
    let mut pcm = i32::from(sample) >> 3;
    let mask: i32 = if pcm >= 0 {
        0xD5
    } else {
        pcm = -pcm - 1;
        0x55
    };

    let segment = ALAW_SEGMENT_END
        .iter()
        .position(|&end| pcm <= end)
        .unwrap_or(ALAW_SEGMENT_END.len()) as i32;
    if segment >= 8 {
        return (0x7F ^ mask) as u8;
    }

    let mut value = segment << 4;
    if segment < 2 {
        value |= (pcm >> 1) & 0x0F;
    } else {
        value |= (pcm >> segment) & 0x0F;
    }
    (value ^ mask) as u8
}

/// Expands an A-law byte to a 16-bit linear sample.
pub fn alaw_to_linear(byte: u8) -> i16 {
    let byte = i32::from(byte ^ 0x55);
    let mut magnitude = (byte & 0x0F) << 4;
    let segment = (byte & 0x70) >> 4;
    match segment {
        0 => magnitude += 8,
        1 => magnitude += 0x108,
        _ => {
            magnitude += 0x108;
            magnitude <<= segment - 1;
        }
    }
    if byte & 0x80 != 0 {
        magnitude as i16
    } else {
        -magnitude as i16
    }
}

pub(crate) struct G711Decoder {
    law: Law,
    channels: usize,
}

impl G711Decoder {
    pub fn new(format: &FormatDescriptor, law: Law) -> Self {
        Self {
            law,
            channels: format.channels as usize,
        }
    }
}

impl PacketDecoder for G711Decoder {
    fn decode(
        &mut self,
        data: &[u8],
        _packets: u32,
        frames: u32,
        out: &mut Vec<f64>,
    ) -> Result<(), CodecError> {
        let samples = frames as usize * self.channels;
        if data.len() < samples {
            return Err(CodecError::corrupt(format!(
                "expected {} G.711 bytes, got {}",
                samples,
                data.len()
            )));
        }
        let expand = match self.law {
            Law::Mu => ulaw_to_linear,
            Law::A => alaw_to_linear,
        };
        out.extend(data[..samples].iter().map(|&b| from_i16(expand(b))));
        Ok(())
    }
}

pub(crate) struct G711Encoder {
    law: Law,
    channels: usize,
}

impl G711Encoder {
    pub fn new(format: &FormatDescriptor, law: Law) -> Self {
        Self {
            law,
            channels: format.channels as usize,
        }
    }
}

impl PacketEncoder for G711Encoder {
    fn encode(&mut self, samples: &[f64], out: &mut Vec<u8>) -> Result<EncodedBatch, CodecError> {
        if samples.len() % self.channels != 0 {
            return Err(CodecError::corrupt(format!(
                "{} samples do not form whole {}-channel frames",
                samples.len(),
                self.channels
            )));
        }
        let compress = match self.law {
            Law::Mu => linear_to_ulaw,
            Law::A => linear_to_alaw,
        };
        out.extend(samples.iter().map(|&s| compress(to_i16(s))));
        let frames = (samples.len() / self.channels) as u32;
        Ok(EncodedBatch {
            packets: frames,
            frames,
        })
    }

    fn flush(&mut self, _out: &mut Vec<u8>) -> Result<EncodedBatch, CodecError> {
        Ok(EncodedBatch::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ulaw_known_values() {
        assert_eq!(linear_to_ulaw(0), 0xFF);
        assert_eq!(ulaw_to_linear(0xFF), 0);
        assert_eq!(ulaw_to_linear(0x00), -32_124);
        assert_eq!(ulaw_to_linear(0x80), 32_124);
        assert_eq!(linear_to_ulaw(i16::MAX), 0x80);
        assert_eq!(linear_to_ulaw(i16::MIN), 0x00);
    }

    #[test]
    fn test_alaw_known_values() {
        assert_eq!(linear_to_alaw(0), 0xD5);
        assert_eq!(alaw_to_linear(0xD5), 8);
        assert_eq!(alaw_to_linear(0x55), -8);
        assert_eq!(linear_to_alaw(i16::MAX), 0xAA);
        assert_eq!(alaw_to_linear(0xAA), 32_256);
    }

    #[test]
    fn test_expansion_is_stable_under_recompression() {
        for byte in 0..=255u8 {
            let linear = ulaw_to_linear(byte);
            assert_eq!(ulaw_to_linear(linear_to_ulaw(linear)), linear, "ulaw {byte:#x}");

            let linear = alaw_to_linear(byte);
            assert_eq!(alaw_to_linear(linear_to_alaw(linear)), linear, "alaw {byte:#x}");
        }
    }

    #[test]
    fn test_companding_is_monotonic() {
        let mut previous = i16::MIN;
        for sample in (i16::MIN..=i16::MAX).step_by(97) {
            let expanded = ulaw_to_linear(linear_to_ulaw(sample));
            assert!(expanded >= previous);
            previous = expanded;
        }
    }

    #[test]
    fn test_encoder_and_decoder_use_whole_frames() {
        let format = FormatDescriptor::mu_law(8_000.0, 2);
        let mut encoder = G711Encoder::new(&format, Law::Mu);
        let mut bytes = Vec::new();
        let batch = encoder.encode(&[0.0, 0.5, -0.5, 0.0], &mut bytes).unwrap();
        assert_eq!(batch, EncodedBatch { packets: 2, frames: 2 });
        assert_eq!(bytes.len(), 4);

        let mut decoder = G711Decoder::new(&format, Law::Mu);
        let mut samples = Vec::new();
        decoder.decode(&bytes, 2, 2, &mut samples).unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 0.5).abs() < 0.02);
    }
}
