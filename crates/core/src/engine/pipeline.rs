//! In-memory sample pipeline between two formats.

use crate::codec::{self, EncodedBatch, PacketDecoder, PacketEncoder};
use crate::format::FormatDescriptor;

use super::channels::{map_channels, ChannelMap};
use super::error::ConversionError;
use super::resampler::Resampler;

/// Decode, remap channels, resample and re-encode one batch at a time.
///
/// Channels are remapped before resampling when the output has fewer of them,
/// so the resampler always works on the narrower stream.
pub(crate) struct SampleConverter {
    decoder: Box<dyn PacketDecoder>,
    encoder: Box<dyn PacketEncoder>,
    channel_map: ChannelMap,
    in_channels: usize,
    out_channels: usize,
    resampler: Option<Resampler>,
    map_first: bool,
    decoded: Vec<f64>,
    mapped: Vec<f64>,
    resampled: Vec<f64>,
}

impl SampleConverter {
    pub fn new(input: &FormatDescriptor, output: &FormatDescriptor) -> Result<Self, ConversionError> {
        let decoder = codec::decoder_for(input)?;
        let encoder = codec::encoder_for(output)?;
        let map_first = output.channels < input.channels;
        let resampler = (input.sample_rate != output.sample_rate).then(|| {
            let channels = if map_first { output.channels } else { input.channels };
            Resampler::new(input.sample_rate, output.sample_rate, channels as usize)
        });
        Ok(Self {
            decoder,
            encoder,
            channel_map: ChannelMap::new(input.channels, output.channels),
            in_channels: input.channels as usize,
            out_channels: output.channels as usize,
            resampler,
            map_first,
            decoded: Vec::new(),
            mapped: Vec::new(),
            resampled: Vec::new(),
        })
    }

    /// Converts one batch of input packets, appending encoded packets to `out`.
    pub fn convert(
        &mut self,
        data: &[u8],
        packets: u32,
        frames: u32,
        out: &mut Vec<u8>,
    ) -> Result<EncodedBatch, ConversionError> {
        self.decoded.clear();
        self.decoder
            .decode(data, packets, frames, &mut self.decoded)?;

        let samples = match self.transform() {
            Stage::Decoded => &self.decoded,
            Stage::Mapped => &self.mapped,
            Stage::Resampled => &self.resampled,
        };
        Ok(self.encoder.encode(samples, out)?)
    }

    /// Drains the resampler and the encoder.
    pub fn flush(&mut self, out: &mut Vec<u8>) -> Result<EncodedBatch, ConversionError> {
        let mut emitted = EncodedBatch::default();
        if let Some(resampler) = self.resampler.as_mut() {
            self.resampled.clear();
            resampler.flush(&mut self.resampled);
            let samples = if self.map_first {
                &self.resampled
            } else {
                self.mapped.clear();
                map_channels(
                    self.channel_map,
                    &self.resampled,
                    self.in_channels,
                    self.out_channels,
                    &mut self.mapped,
                );
                &self.mapped
            };
            emitted = self.encoder.encode(samples, out)?;
        }

        let tail = self.encoder.flush(out)?;
        Ok(EncodedBatch {
            packets: emitted.packets + tail.packets,
            frames: emitted.frames + tail.frames,
        })
    }

    /// Applies channel mapping and resampling to `decoded` in the right order,
    /// returning the buffer holding the result.
    fn transform(&mut self) -> Stage {
        let Some(resampler) = self.resampler.as_mut() else {
            if self.channel_map == ChannelMap::Identity {
                return Stage::Decoded;
            }
            self.mapped.clear();
            map_channels(
                self.channel_map,
                &self.decoded,
                self.in_channels,
                self.out_channels,
                &mut self.mapped,
            );
            return Stage::Mapped;
        };

        self.resampled.clear();
        if self.map_first {
            self.mapped.clear();
            map_channels(
                self.channel_map,
                &self.decoded,
                self.in_channels,
                self.out_channels,
                &mut self.mapped,
            );
            resampler.process(&self.mapped, &mut self.resampled);
            Stage::Resampled
        } else {
            resampler.process(&self.decoded, &mut self.resampled);
            self.mapped.clear();
            map_channels(
                self.channel_map,
                &self.resampled,
                self.in_channels,
                self.out_channels,
                &mut self.mapped,
            );
            Stage::Mapped
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Decoded,
    Mapped,
    Resampled,
}
