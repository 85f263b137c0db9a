//! Testing utilities and in-memory container backends.
//!
//! The mocks plug into [`StreamEndpoint::from_reader`](crate::endpoint::StreamEndpoint::from_reader)
//! and [`StreamEndpoint::from_writer`](crate::endpoint::StreamEndpoint::from_writer),
//! so engine behavior can be exercised without touching the filesystem.
//!
//! # Example
//!
//! ```rust,ignore
//! use audioconv_core::testing::{fixtures, MockReader, MockWriter};
//!
//! let format = fixtures::cd_format();
//! let reader = MockReader::new(format.clone(), fixtures::sine_pcm16(4410, 2, 44_100.0, 440.0));
//! let writer = MockWriter::new();
//!
//! let mut input = StreamEndpoint::from_reader(Box::new(reader.clone()))?;
//! let mut output = StreamEndpoint::from_writer(Box::new(writer.clone()), format)?;
//! ConversionEngine::new(&mut input, &mut output).convert()?;
//!
//! assert_eq!(writer.frames_written(), 4410);
//! ```

mod mock_reader;
mod mock_writer;

pub use mock_reader::{MockReader, RecordedRead};
pub use mock_writer::{MockWriter, RecordedWrite};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::container::ContainerType;
    use crate::endpoint::{EndpointError, StreamEndpoint};
    use crate::format::{ChannelLayoutTag, FormatDescriptor};

    /// 44.1 kHz stereo 16-bit little-endian PCM.
    pub fn cd_format() -> FormatDescriptor {
        FormatDescriptor::linear_pcm(44_100.0, 2, 16).with_channel_layout(ChannelLayoutTag::Stereo)
    }

    /// 8 kHz mono 16-bit little-endian PCM.
    pub fn telephone_format() -> FormatDescriptor {
        FormatDescriptor::linear_pcm(8_000.0, 1, 16)
    }

    /// Interleaved little-endian 16-bit sine wave, identical on every channel.
    pub fn sine_pcm16(frames: usize, channels: usize, sample_rate: f64, freq: f64) -> Vec<u8> {
        let mut out = Vec::with_capacity(frames * channels * 2);
        for n in 0..frames {
            let t = n as f64 / sample_rate;
            let sample = ((2.0 * std::f64::consts::PI * freq * t).sin() * 0.5 * 32767.0) as i16;
            for _ in 0..channels {
                out.extend_from_slice(&sample.to_le_bytes());
            }
        }
        out
    }

    /// Interleaved little-endian 16-bit ramp; frame `n` holds `n` on every channel.
    pub fn ramp_pcm16(frames: usize, channels: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(frames * channels * 2);
        for n in 0..frames {
            let sample = (n % 32768) as i16;
            for _ in 0..channels {
                out.extend_from_slice(&sample.to_le_bytes());
            }
        }
        out
    }

    /// Writes `payload` as whole packets of `format` into a new file at `path`.
    pub fn write_file(
        path: &Path,
        container: ContainerType,
        format: &FormatDescriptor,
        payload: &[u8],
        frames: u64,
    ) -> Result<(), EndpointError> {
        let mut output = StreamEndpoint::create(path, container, format.clone())?;
        let bytes_per_packet = format.bytes_per_packet as usize;
        let packets = payload.len().checked_div(bytes_per_packet).unwrap_or(0);
        if packets > 0 {
            let frames = frames.min(packets as u64 * u64::from(format.frames_per_packet));
            output.write_packets(&payload[..packets * bytes_per_packet], packets as u32, frames as u32)?;
        }
        output.close();
        Ok(())
    }

    /// Writes an uncompressed WAV file; every packet is one frame.
    pub fn write_wav(path: &Path, format: &FormatDescriptor, payload: &[u8]) -> Result<(), EndpointError> {
        let frames = payload.len() as u64 / u64::from(format.bytes_per_packet.max(1));
        write_file(path, ContainerType::Wav, format, payload, frames)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures;

    #[test]
    fn test_sine_is_interleaved() {
        let data = fixtures::sine_pcm16(10, 2, 8_000.0, 1_000.0);
        assert_eq!(data.len(), 40);
        for frame in data.chunks(4) {
            assert_eq!(frame[..2], frame[2..]);
        }
        // sin(0) == 0
        assert_eq!(&data[..2], &[0, 0]);
    }

    #[test]
    fn test_ramp_values() {
        let data = fixtures::ramp_pcm16(3, 1);
        assert_eq!(data, vec![0, 0, 1, 0, 2, 0]);
    }

    #[test]
    fn test_write_wav_reopens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ramp.wav");
        let format = fixtures::telephone_format();
        fixtures::write_wav(&path, &format, &fixtures::ramp_pcm16(100, 1)).unwrap();

        let input = crate::endpoint::StreamEndpoint::open(&path).unwrap();
        assert_eq!(input.total_frames(), 100);
        assert_eq!(input.format(), &format);
    }
}
