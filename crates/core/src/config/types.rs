use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::container::ContainerType;
use crate::engine::ConverterConfig;
use crate::format::{ChannelLayoutTag, CodecId, FormatDescriptor};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub job: JobConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
}

/// One file-to-file conversion
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Output container; inferred from the output extension when absent.
    #[serde(default)]
    pub container: Option<ContainerType>,
    #[serde(default)]
    pub format: TargetFormat,
}

impl JobConfig {
    /// Output container, explicit or inferred from the output path.
    pub fn output_container(&self) -> Option<ContainerType> {
        self.container
            .or_else(|| ContainerType::from_path(&self.output))
    }
}

/// Codec family of the output stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCodec {
    /// Integer linear PCM
    #[default]
    Pcm,
    /// IEEE float linear PCM
    Float,
    /// G.711 μ-law
    Ulaw,
    /// G.711 A-law
    Alaw,
    /// IMA ADPCM (WAV only)
    ImaAdpcm,
}

/// Requested output format. Unset fields keep the source value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TargetFormat {
    #[serde(default)]
    pub codec: TargetCodec,
    #[serde(default)]
    pub sample_rate: Option<f64>,
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub bits_per_channel: Option<u32>,
    /// Byte order of linear PCM; defaults to the container's native order.
    #[serde(default)]
    pub big_endian: Option<bool>,
    /// Frames per IMA ADPCM block (1 + 8k).
    #[serde(default)]
    pub frames_per_packet: Option<u32>,
    #[serde(default)]
    pub channel_layout: Option<ChannelLayoutTag>,
}

impl TargetFormat {
    /// Builds the output descriptor for a stream read from `source` and written
    /// to `container`.
    ///
    /// The result is not validated; endpoint creation rejects combinations the
    /// container cannot carry.
    pub fn resolve(&self, source: &FormatDescriptor, container: ContainerType) -> FormatDescriptor {
        let rate = self.sample_rate.unwrap_or(source.sample_rate);
        let channels = self.channels.unwrap_or(source.channels);
        let big_endian = self.big_endian.unwrap_or(container.is_big_endian());

        let source_bits = match source.codec {
            CodecId::LinearPcm { float, .. } => Some((float, source.bits_per_channel)),
            _ => None,
        };

        let mut format = match self.codec {
            TargetCodec::Pcm => {
                let bits = self.bits_per_channel.unwrap_or(match source_bits {
                    Some((false, bits)) => bits,
                    _ => 16,
                });
                let format = FormatDescriptor::linear_pcm(rate, channels, bits)
                    .with_big_endian(big_endian);
                if bits == 8 && container == ContainerType::Wav {
                    format.with_unsigned()
                } else {
                    format
                }
            }
            TargetCodec::Float => {
                let bits = self.bits_per_channel.unwrap_or(match source_bits {
                    Some((true, bits)) => bits,
                    _ => 32,
                });
                FormatDescriptor::float_pcm(rate, channels, bits).with_big_endian(big_endian)
            }
            TargetCodec::Ulaw => FormatDescriptor::mu_law(rate, channels),
            TargetCodec::Alaw => FormatDescriptor::a_law(rate, channels),
            TargetCodec::ImaAdpcm => {
                FormatDescriptor::ima_adpcm(rate, channels, self.frames_per_packet.unwrap_or(0))
            }
        };

        format.channel_layout = match self.channel_layout {
            Some(layout) => Some(layout),
            None if channels == source.channels => source.channel_layout,
            None => None,
        };
        format
    }
}
