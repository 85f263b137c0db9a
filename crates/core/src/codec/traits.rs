//! Trait definitions for the codec module.

use super::error::CodecError;

/// Packets and frames produced by one encoder call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodedBatch {
    /// Whole packets appended to the output.
    pub packets: u32,
    /// Audio frames those packets carry.
    pub frames: u32,
}

/// Turns packet payloads into interleaved normalized samples.
pub trait PacketDecoder: Send {
    /// Decodes `packets` packets from `data`, appending `frames` frames of
    /// interleaved samples to `out`.
    ///
    /// `frames` may be smaller than `packets * frames_per_packet` for the last
    /// packet of a stream; surplus frames in that packet are dropped.
    fn decode(
        &mut self,
        data: &[u8],
        packets: u32,
        frames: u32,
        out: &mut Vec<f64>,
    ) -> Result<(), CodecError>;
}

/// Turns interleaved normalized samples into packets.
pub trait PacketEncoder: Send {
    /// Consumes interleaved samples and appends every complete packet to `out`.
    ///
    /// Encoders grouping several frames per packet keep the remainder buffered
    /// until more samples arrive or [`flush`](Self::flush) is called.
    fn encode(&mut self, samples: &[f64], out: &mut Vec<u8>) -> Result<EncodedBatch, CodecError>;

    /// Emits trailing packets built from buffered frames.
    fn flush(&mut self, out: &mut Vec<u8>) -> Result<EncodedBatch, CodecError>;

    /// Frames buffered but not yet emitted.
    fn pending_frames(&self) -> u32 {
        0
    }
}
