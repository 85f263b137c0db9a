//! IMA/DVI ADPCM in the WAV block layout.
//!
//! Each block starts with a 4-byte header per channel (initial predictor as
//! little-endian i16, step index, reserved byte). The header predictor is the
//! block's first frame. The remaining `frames_per_packet - 1` samples follow as
//! 4-bit codes, interleaved per channel in 4-byte words of 8 codes each, low
//! nibble first.

use crate::format::FormatDescriptor;

use super::error::CodecError;
use super::pcm::{from_i16, to_i16};
use super::traits::{EncodedBatch, PacketDecoder, PacketEncoder};

const INDEX_TABLE: [i32; 16] = [-1, -1, -1, -1, 2, 4, 6, 8, -1, -1, -1, -1, 2, 4, 6, 8];

const STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408,
    449, 494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630,
    9493, 10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794,
    32767,
];

/// Bytes in one block of `frames_per_packet` frames.
pub(crate) fn block_size(channels: u32, frames_per_packet: u32) -> u32 {
    (4 + frames_per_packet.saturating_sub(1) / 2) * channels
}

/// Predictor state of one channel.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    predictor: i32,
    index: i32,
}

impl ChannelState {
    /// Applies one 4-bit code and returns the reconstructed sample.
    fn expand(&mut self, code: u8) -> i16 {
        let step = STEP_TABLE[self.index as usize];
        let mut diff = step >> 3;
        if code & 4 != 0 {
            diff += step;
        }
        if code & 2 != 0 {
            diff += step >> 1;
        }
        if code & 1 != 0 {
            diff += step >> 2;
        }
        if code & 8 != 0 {
            self.predictor -= diff;
        } else {
            self.predictor += diff;
        }
        self.predictor = self.predictor.clamp(i16::MIN as i32, i16::MAX as i32);
        self.index = (self.index + INDEX_TABLE[code as usize & 0x0F]).clamp(0, 88);
        self.predictor as i16
    }

    /// Chooses the code closest to `sample` and advances the state with it.
    fn compress(&mut self, sample: i16) -> u8 {
        let step = STEP_TABLE[self.index as usize];
        let mut diff = i32::from(sample) - self.predictor;
        let mut code = 0u8;
        if diff < 0 {
            code = 8;
            diff = -diff;
        }
        let mut threshold = step;
        for bit in [4u8, 2, 1] {
            if diff >= threshold {
                code |= bit;
                diff -= threshold;
            }
            threshold >>= 1;
        }
        self.expand(code);
        code
    }
}

pub(crate) struct ImaAdpcmDecoder {
    channels: usize,
    frames_per_packet: usize,
    bytes_per_packet: usize,
    block: Vec<i16>,
}

impl ImaAdpcmDecoder {
    pub fn new(format: &FormatDescriptor) -> Self {
        let channels = format.channels as usize;
        let frames_per_packet = format.frames_per_packet as usize;
        Self {
            channels,
            frames_per_packet,
            bytes_per_packet: format.bytes_per_packet as usize,
            block: vec![0; channels * frames_per_packet],
        }
    }

    fn decode_block(&mut self, block: &[u8]) {
        let channels = self.channels;
        let mut states = vec![ChannelState::default(); channels];
        for (ch, state) in states.iter_mut().enumerate() {
            let header = &block[ch * 4..ch * 4 + 4];
            state.predictor = i32::from(i16::from_le_bytes([header[0], header[1]]));
            state.index = i32::from(header[2]).min(88);
            self.block[ch] = state.predictor as i16;
        }

        let groups = (self.frames_per_packet - 1) / 8;
        let payload = &block[channels * 4..];
        for group in 0..groups {
            for (ch, state) in states.iter_mut().enumerate() {
                let word = &payload[(group * channels + ch) * 4..][..4];
                for (i, &byte) in word.iter().enumerate() {
                    for (half, code) in [(0, byte & 0x0F), (1, byte >> 4)] {
                        let frame = 1 + group * 8 + i * 2 + half;
                        self.block[frame * channels + ch] = state.expand(code);
                    }
                }
            }
        }
    }
}

impl PacketDecoder for ImaAdpcmDecoder {
    fn decode(
        &mut self,
        data: &[u8],
        packets: u32,
        frames: u32,
        out: &mut Vec<f64>,
    ) -> Result<(), CodecError> {
        let needed = packets as usize * self.bytes_per_packet;
        if data.len() < needed {
            return Err(CodecError::corrupt(format!(
                "expected {} bytes for {} ADPCM blocks, got {}",
                needed,
                packets,
                data.len()
            )));
        }

        let mut remaining = frames as usize;
        for block in data[..needed].chunks_exact(self.bytes_per_packet) {
            if remaining == 0 {
                break;
            }
            self.decode_block(block);
            let take = remaining.min(self.frames_per_packet);
            out.extend(
                self.block[..take * self.channels]
                    .iter()
                    .map(|&s| from_i16(s)),
            );
            remaining -= take;
        }
        Ok(())
    }
}

pub(crate) struct ImaAdpcmEncoder {
    channels: usize,
    frames_per_packet: usize,
    states: Vec<ChannelState>,
    pending: Vec<i16>,
}

impl ImaAdpcmEncoder {
    pub fn new(format: &FormatDescriptor) -> Self {
        let channels = format.channels as usize;
        Self {
            channels,
            frames_per_packet: format.frames_per_packet as usize,
            states: vec![ChannelState::default(); channels],
            pending: Vec::new(),
        }
    }

    fn encode_block(&mut self, block: &[i16], out: &mut Vec<u8>) {
        let channels = self.channels;
        for (ch, state) in self.states.iter_mut().enumerate() {
            state.predictor = i32::from(block[ch]);
            out.extend_from_slice(&block[ch].to_le_bytes());
            out.push(state.index as u8);
            out.push(0);
        }

        let groups = (self.frames_per_packet - 1) / 8;
        for group in 0..groups {
            for (ch, state) in self.states.iter_mut().enumerate() {
                for pair in 0..4 {
                    let first = 1 + group * 8 + pair * 2;
                    let low = state.compress(block[first * channels + ch]);
                    let high = state.compress(block[(first + 1) * channels + ch]);
                    out.push(low | (high << 4));
                }
            }
        }
    }
}

impl PacketEncoder for ImaAdpcmEncoder {
    fn encode(&mut self, samples: &[f64], out: &mut Vec<u8>) -> Result<EncodedBatch, CodecError> {
        if samples.len() % self.channels != 0 {
            return Err(CodecError::corrupt(format!(
                "{} samples do not form whole {}-channel frames",
                samples.len(),
                self.channels
            )));
        }
        self.pending.extend(samples.iter().map(|&s| to_i16(s)));

        let block_samples = self.frames_per_packet * self.channels;
        let blocks = self.pending.len() / block_samples;
        if blocks == 0 {
            return Ok(EncodedBatch::default());
        }

        let pending = std::mem::take(&mut self.pending);
        for block in pending[..blocks * block_samples].chunks_exact(block_samples) {
            self.encode_block(block, out);
        }
        self.pending = pending[blocks * block_samples..].to_vec();

        Ok(EncodedBatch {
            packets: blocks as u32,
            frames: (blocks * self.frames_per_packet) as u32,
        })
    }

    fn flush(&mut self, out: &mut Vec<u8>) -> Result<EncodedBatch, CodecError> {
        if self.pending.is_empty() {
            return Ok(EncodedBatch::default());
        }
        let frames = self.pending.len() / self.channels;

        // Pad the tail block by holding the last frame.
        let mut block = std::mem::take(&mut self.pending);
        let last_frame = block[block.len() - self.channels..].to_vec();
        while block.len() < self.frames_per_packet * self.channels {
            block.extend_from_slice(&last_frame);
        }
        self.encode_block(&block, out);

        Ok(EncodedBatch {
            packets: 1,
            frames: frames as u32,
        })
    }

    fn pending_frames(&self) -> u32 {
        (self.pending.len() / self.channels) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frames: usize, channels: usize) -> Vec<f64> {
        (0..frames)
            .flat_map(|i| {
                (0..channels).map(move |ch| {
                    let phase = i as f64 * 0.05 + ch as f64;
                    0.6 * phase.sin()
                })
            })
            .collect()
    }

    #[test]
    fn test_block_size() {
        assert_eq!(block_size(1, 505), 256);
        assert_eq!(block_size(2, 505), 512);
        assert_eq!(block_size(2, 1017), 1024);
    }

    #[test]
    fn test_encoder_buffers_until_block_is_full() {
        let format = FormatDescriptor::ima_adpcm(8_000.0, 1, 9);
        let mut encoder = ImaAdpcmEncoder::new(&format);
        let mut out = Vec::new();

        let batch = encoder.encode(&sine(5, 1), &mut out).unwrap();
        assert_eq!(batch, EncodedBatch::default());
        assert_eq!(encoder.pending_frames(), 5);
        assert!(out.is_empty());

        let batch = encoder.encode(&sine(6, 1), &mut out).unwrap();
        assert_eq!(batch, EncodedBatch { packets: 1, frames: 9 });
        assert_eq!(out.len(), 8);
        assert_eq!(encoder.pending_frames(), 2);
    }

    #[test]
    fn test_flush_pads_tail_block() {
        let format = FormatDescriptor::ima_adpcm(8_000.0, 2, 17);
        let mut encoder = ImaAdpcmEncoder::new(&format);
        let mut out = Vec::new();
        encoder.encode(&sine(20, 2), &mut out).unwrap();
        assert_eq!(out.len(), 24);

        let batch = encoder.flush(&mut out).unwrap();
        assert_eq!(batch, EncodedBatch { packets: 1, frames: 3 });
        assert_eq!(out.len(), 48);
        assert_eq!(encoder.pending_frames(), 0);

        // A second flush has nothing left to emit.
        assert_eq!(encoder.flush(&mut out).unwrap(), EncodedBatch::default());
    }

    #[test]
    fn test_round_trip_tracks_signal() {
        let format = FormatDescriptor::ima_adpcm(22_050.0, 2, 505);
        let input = sine(505 * 3, 2);

        let mut encoder = ImaAdpcmEncoder::new(&format);
        let mut bytes = Vec::new();
        let batch = encoder.encode(&input, &mut bytes).unwrap();
        assert_eq!(batch.packets, 3);

        let mut decoder = ImaAdpcmDecoder::new(&format);
        let mut output = Vec::new();
        decoder.decode(&bytes, 3, 505 * 3, &mut output).unwrap();
        assert_eq!(output.len(), input.len());

        // The header sample of each block is exact.
        assert_eq!(output[0], from_i16(to_i16(input[0])));
        let max_error = input
            .iter()
            .zip(&output)
            .skip(64)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(max_error < 0.05, "max error {max_error}");
    }

    #[test]
    fn test_decode_truncates_last_block() {
        let format = FormatDescriptor::ima_adpcm(8_000.0, 1, 9);
        let mut encoder = ImaAdpcmEncoder::new(&format);
        let mut bytes = Vec::new();
        encoder.encode(&sine(18, 1), &mut bytes).unwrap();

        let mut decoder = ImaAdpcmDecoder::new(&format);
        let mut output = Vec::new();
        decoder.decode(&bytes, 2, 12, &mut output).unwrap();
        assert_eq!(output.len(), 12);
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let format = FormatDescriptor::ima_adpcm(8_000.0, 1, 9);
        let mut decoder = ImaAdpcmDecoder::new(&format);
        let mut output = Vec::new();
        let result = decoder.decode(&[0u8; 7], 1, 9, &mut output);
        assert!(matches!(result, Err(CodecError::Corrupt { .. })));
    }
}
