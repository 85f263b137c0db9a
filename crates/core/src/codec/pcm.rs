//! Linear PCM codec.

use crate::format::{CodecId, FormatDescriptor};

use super::error::CodecError;
use super::traits::{EncodedBatch, PacketDecoder, PacketEncoder};

/// Byte layout of one linear PCM channel sample.
#[derive(Debug, Clone, Copy)]
struct SampleLayout {
    bytes: usize,
    float: bool,
    big_endian: bool,
    signed: bool,
    /// `2^(bits - 1)`, the integer full scale.
    full_scale: f64,
}

impl SampleLayout {
    fn from_format(format: &FormatDescriptor) -> Self {
        let (float, big_endian, signed) = match format.codec {
            CodecId::LinearPcm {
                float,
                big_endian,
                signed,
            } => (float, big_endian, signed),
            _ => (false, false, true),
        };
        let bits = format.bits_per_channel;
        Self {
            bytes: (bits / 8) as usize,
            float,
            big_endian,
            signed,
            full_scale: (1u64 << (bits.max(1) - 1)) as f64,
        }
    }

    fn read(&self, raw: &[u8]) -> f64 {
        if self.float {
            return match self.bytes {
                4 => {
                    let bytes = [raw[0], raw[1], raw[2], raw[3]];
                    f64::from(if self.big_endian {
                        f32::from_be_bytes(bytes)
                    } else {
                        f32::from_le_bytes(bytes)
                    })
                }
                _ => {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(&raw[..8]);
                    if self.big_endian {
                        f64::from_be_bytes(bytes)
                    } else {
                        f64::from_le_bytes(bytes)
                    }
                }
            };
        }

        let mut value: u32 = 0;
        if self.big_endian {
            for &b in &raw[..self.bytes] {
                value = (value << 8) | u32::from(b);
            }
        } else {
            for &b in raw[..self.bytes].iter().rev() {
                value = (value << 8) | u32::from(b);
            }
        }

        let integer = if self.signed {
            let shift = 32 - (self.bytes as u32 * 8);
            i64::from(((value << shift) as i32) >> shift)
        } else {
            i64::from(value) - self.full_scale as i64
        };
        integer as f64 / self.full_scale
    }

    fn write(&self, sample: f64, out: &mut Vec<u8>) {
        if self.float {
            if self.bytes == 4 {
                let value = sample as f32;
                if self.big_endian {
                    out.extend_from_slice(&value.to_be_bytes());
                } else {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            } else if self.big_endian {
                out.extend_from_slice(&sample.to_be_bytes());
            } else {
                out.extend_from_slice(&sample.to_le_bytes());
            }
            return;
        }

        let quantized = quantize(sample, self.full_scale);
        let value = if self.signed {
            quantized as i32 as u32
        } else {
            (quantized + self.full_scale as i64) as u32
        };
        if self.big_endian {
            for i in (0..self.bytes).rev() {
                out.push((value >> (i * 8)) as u8);
            }
        } else {
            for i in 0..self.bytes {
                out.push((value >> (i * 8)) as u8);
            }
        }
    }
}

/// Rounds a normalized sample to the nearest integer step and clamps it to the
/// representable range `[-full_scale, full_scale - 1]`.
pub(crate) fn quantize(sample: f64, full_scale: f64) -> i64 {
    if sample.is_nan() {
        return 0;
    }
    (sample * full_scale).round().clamp(-full_scale, full_scale - 1.0) as i64
}

/// Converts a normalized sample to a 16-bit integer.
pub(crate) fn to_i16(sample: f64) -> i16 {
    quantize(sample, 32_768.0) as i16
}

/// Converts a 16-bit integer to a normalized sample.
pub(crate) fn from_i16(sample: i16) -> f64 {
    f64::from(sample) / 32_768.0
}

/// Decoder for linear PCM packets.
pub(crate) struct PcmDecoder {
    layout: SampleLayout,
    channels: usize,
}

impl PcmDecoder {
    pub fn new(format: &FormatDescriptor) -> Self {
        Self {
            layout: SampleLayout::from_format(format),
            channels: format.channels as usize,
        }
    }
}

impl PacketDecoder for PcmDecoder {
    fn decode(
        &mut self,
        data: &[u8],
        _packets: u32,
        frames: u32,
        out: &mut Vec<f64>,
    ) -> Result<(), CodecError> {
        let samples = frames as usize * self.channels;
        let needed = samples * self.layout.bytes;
        if data.len() < needed {
            return Err(CodecError::corrupt(format!(
                "expected {} bytes for {} frames, got {}",
                needed,
                frames,
                data.len()
            )));
        }
        out.reserve(samples);
        out.extend(
            data[..needed]
                .chunks_exact(self.layout.bytes)
                .map(|raw| self.layout.read(raw)),
        );
        Ok(())
    }
}

/// Encoder for linear PCM packets.
pub(crate) struct PcmEncoder {
    layout: SampleLayout,
    channels: usize,
}

impl PcmEncoder {
    pub fn new(format: &FormatDescriptor) -> Self {
        Self {
            layout: SampleLayout::from_format(format),
            channels: format.channels as usize,
        }
    }
}

impl PacketEncoder for PcmEncoder {
    fn encode(&mut self, samples: &[f64], out: &mut Vec<u8>) -> Result<EncodedBatch, CodecError> {
        if samples.len() % self.channels != 0 {
            return Err(CodecError::corrupt(format!(
                "{} samples do not form whole {}-channel frames",
                samples.len(),
                self.channels
            )));
        }
        out.reserve(samples.len() * self.layout.bytes);
        for &sample in samples {
            self.layout.write(sample, out);
        }
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
