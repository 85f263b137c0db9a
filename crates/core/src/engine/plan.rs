//! Batch sizing.
//!
//! A batch of `P` input packets holds `P * in_fpp` frames. Resampling by
//! `r = out_rate / in_rate` turns those into at most `P * ceil(in_fpp * r)`
//! frames, plus `ceil(r) + 1` frames the resampler carried over from the previous
//! batch and `out_fpp - 1` frames the encoder kept pending. The plan picks the
//! largest `P` whose encoded output, raw input and decoded samples all fit the
//! working buffer.

use crate::format::FormatDescriptor;

/// Bytes of one decoded sample.
const SAMPLE_BYTES: u64 = std::mem::size_of::<f64>() as u64;

/// Packets per read and the buffer capacity they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchPlan {
    pub packets_per_read: u32,
    /// Working buffer capacity, grown to fit one packet when needed.
    pub capacity: usize,
    /// Upper bound on the bytes written for one batch.
    pub max_output_bytes: usize,
}

impl BatchPlan {
    /// Plan for copying packets unchanged.
    pub fn passthrough(format: &FormatDescriptor, capacity: usize) -> Self {
        let bytes_per_packet = u64::from(format.bytes_per_packet.max(1));
        let packets = (capacity as u64 / bytes_per_packet).clamp(1, u64::from(u32::MAX));
        let max_output_bytes = (packets * bytes_per_packet) as usize;
        Self {
            packets_per_read: packets as u32,
            capacity: capacity.max(max_output_bytes),
            max_output_bytes,
        }
    }

    /// Plan for decoding, converting and re-encoding.
    pub fn converting(input: &FormatDescriptor, output: &FormatDescriptor, capacity: usize) -> Self {
        let bounds = Bounds::new(input, output);
        let capacity_bytes = capacity as u64;

        let max_output_packets = capacity_bytes / bounds.out_bpp;
        let by_output = (max_output_packets * bounds.out_fpp)
            .checked_sub(bounds.slack_frames)
            .map(|room| room / bounds.frames_per_in_packet)
            .unwrap_or(0);
        let by_input = capacity_bytes / bounds.in_bpp;
        let by_decoded = capacity_bytes / bounds.decoded_bytes_per_packet;

        let packets = by_output.min(by_input).min(by_decoded).min(u64::from(u32::MAX));
        if packets == 0 {
            let needed = bounds.worst_case_bytes(1);
            return Self {
                packets_per_read: 1,
                capacity: (needed as usize).max(capacity),
                max_output_bytes: bounds.output_bytes(1) as usize,
            };
        }
        Self {
            packets_per_read: packets as u32,
            capacity,
            max_output_bytes: bounds.output_bytes(packets) as usize,
        }
    }
}

struct Bounds {
    in_bpp: u64,
    out_bpp: u64,
    out_fpp: u64,
    /// Output frames produced per input packet, rounded up.
    frames_per_in_packet: u64,
    /// Resampler carry plus encoder pending frames.
    slack_frames: u64,
    decoded_bytes_per_packet: u64,
}

impl Bounds {
    fn new(input: &FormatDescriptor, output: &FormatDescriptor) -> Self {
        let ratio = output.sample_rate / input.sample_rate;
        let in_fpp = u64::from(input.frames_per_packet);
        let out_fpp = u64::from(output.frames_per_packet);
        let widest = u64::from(input.channels.max(output.channels));
        Self {
            in_bpp: u64::from(input.bytes_per_packet.max(1)),
            out_bpp: u64::from(output.bytes_per_packet.max(1)),
            out_fpp,
            frames_per_in_packet: ((in_fpp as f64 * ratio).ceil() as u64).max(1),
            slack_frames: ratio.ceil() as u64 + 1 + (out_fpp - 1),
            decoded_bytes_per_packet: in_fpp * widest * SAMPLE_BYTES,
        }
    }

    fn output_bytes(&self, packets: u64) -> u64 {
        let frames = packets * self.frames_per_in_packet + self.slack_frames;
        frames.div_ceil(self.out_fpp) * self.out_bpp
    }

    fn worst_case_bytes(&self, packets: u64) -> u64 {
        self.output_bytes(packets)
            .max(packets * self.in_bpp)
            .max(packets * self.decoded_bytes_per_packet)
    }
}
