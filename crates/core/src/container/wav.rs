//! RIFF WAVE backend.
//!
//! Reads and writes linear PCM (format tag 1), IEEE float (3), A-law (6),
//! μ-law (7), IMA ADPCM (0x11) and WAVE_FORMAT_EXTENSIBLE wrappers of the first
//! four. Sizes are patched on finalize, so the writer needs a seekable file.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};

use tracing::{debug, warn};

use crate::codec;
use crate::format::{ChannelLayoutTag, CodecId, FormatDescriptor};

use super::bytes::{
    eof_as_malformed, patch_u32, read_chunk_body, read_chunk_header, skip_chunk, u16_le, u32_le,
};
use super::cbr::{CbrReader, PacketRegion};
use super::error::ContainerError;
use super::traits::{ContainerBackend, ContainerReader, ContainerWriter};
use super::types::ContainerType;

const TAG_PCM: u16 = 0x0001;
const TAG_FLOAT: u16 = 0x0003;
const TAG_ALAW: u16 = 0x0006;
const TAG_ULAW: u16 = 0x0007;
const TAG_IMA_ADPCM: u16 = 0x0011;
const TAG_EXTENSIBLE: u16 = 0xFFFE;

/// Tail of the KSDATAFORMAT_SUBTYPE GUIDs after the leading format tag.
const SUBTYPE_GUID_TAIL: [u8; 14] = [
    0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// Backend for `.wav` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavBackend;

impl ContainerBackend for WavBackend {
    fn container_type(&self) -> ContainerType {
        ContainerType::Wav
    }

    fn sniff(&self, header: &[u8]) -> bool {
        header.len() >= 12 && &header[..4] == b"RIFF" && &header[8..12] == b"WAVE"
    }

    fn check_format(&self, format: &FormatDescriptor) -> Result<(), ContainerError> {
        codec::check_supported(format).map_err(|e| ContainerError::unsupported(e.to_string()))?;
        format_tag(format)?;
        if format.sample_rate.fract() != 0.0 || format.sample_rate > f64::from(u32::MAX) {
            return Err(ContainerError::unsupported(format!(
                "WAV stores integral sample rates, got {}",
                format.sample_rate
            )));
        }
        if format.channels > u32::from(u16::MAX) || format.bytes_per_packet > u32::from(u16::MAX) {
            return Err(ContainerError::unsupported(
                "channel count or block size exceeds WAV limits",
            ));
        }
        Ok(())
    }

    fn open_reader(&self, file: File) -> Result<Box<dyn ContainerReader>, ContainerError> {
        Ok(Box::new(open_wav(BufReader::new(file))?))
    }

    fn create_writer(
        &self,
        file: File,
        format: &FormatDescriptor,
    ) -> Result<Box<dyn ContainerWriter>, ContainerError> {
        self.check_format(format)?;
        Ok(Box::new(WavWriter::create(BufWriter::new(file), format)?))
    }
}

/// Contents of the `fmt ` chunk.
#[derive(Debug, Clone)]
struct FmtChunk {
    tag: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
    samples_per_block: Option<u16>,
    channel_mask: Option<u32>,
}

impl FmtChunk {
    fn parse(body: &[u8]) -> Result<Self, ContainerError> {
        if body.len() < 16 {
            return Err(ContainerError::malformed(format!(
                "fmt chunk is {} bytes, expected at least 16",
                body.len()
            )));
        }
        let mut chunk = Self {
            tag: u16_le(body, 0),
            channels: u16_le(body, 2),
            sample_rate: u32_le(body, 4),
            block_align: u16_le(body, 12),
            bits_per_sample: u16_le(body, 14),
            samples_per_block: None,
            channel_mask: None,
        };
        let extra = if body.len() >= 18 { u16_le(body, 16) as usize } else { 0 };

        if chunk.tag == TAG_EXTENSIBLE {
            if extra < 22 || body.len() < 40 {
                return Err(ContainerError::malformed("truncated WAVE_FORMAT_EXTENSIBLE"));
            }
            chunk.channel_mask = Some(u32_le(body, 20));
            if body[26..40] != SUBTYPE_GUID_TAIL {
                return Err(ContainerError::unsupported("unknown extensible sub-format GUID"));
            }
            chunk.tag = u16_le(body, 24);
        } else if chunk.tag == TAG_IMA_ADPCM {
            if extra < 2 || body.len() < 20 {
                return Err(ContainerError::malformed("IMA ADPCM fmt chunk lacks samples per block"));
            }
            chunk.samples_per_block = Some(u16_le(body, 18));
        }
        Ok(chunk)
    }

    fn to_descriptor(&self) -> Result<FormatDescriptor, ContainerError> {
        let rate = f64::from(self.sample_rate);
        let channels = u32::from(self.channels);
        let bits = u32::from(self.bits_per_sample);

        let mut format = match self.tag {
            TAG_PCM => {
                // Samples narrower than their container are stored left-justified.
                let format = FormatDescriptor::linear_pcm(rate, channels, (bits + 7) / 8 * 8);
                if format.bits_per_channel == 8 {
                    format.with_unsigned()
                } else {
                    format
                }
            }
            TAG_FLOAT => FormatDescriptor::float_pcm(rate, channels, bits),
            TAG_ALAW => FormatDescriptor::a_law(rate, channels),
            TAG_ULAW => FormatDescriptor::mu_law(rate, channels),
            TAG_IMA_ADPCM => {
                let frames = u32::from(self.samples_per_block.unwrap_or(0));
                let mut format = FormatDescriptor::ima_adpcm(rate, channels, frames);
                format.bytes_per_packet = u32::from(self.block_align);
                format
            }
            other => {
                return Err(ContainerError::unsupported(format!(
                    "WAV format tag {:#06x}",
                    other
                )))
            }
        };

        if format.bytes_per_packet != u32::from(self.block_align) {
            return Err(ContainerError::unsupported(format!(
                "block align {} does not match {} bit x {} channels",
                self.block_align, bits, channels
            )));
        }
        if let Some(layout) = self.channel_mask.and_then(ChannelLayoutTag::from_speaker_mask) {
            if layout.channel_count() == channels {
                format.channel_layout = Some(layout);
            }
        }
        format
            .validate()
            .map_err(|e| ContainerError::unsupported(e.to_string()))?;
        codec::check_supported(&format).map_err(|e| ContainerError::unsupported(e.to_string()))?;
        Ok(format)
    }
}

/// Parses the RIFF header and positions a packet reader over the `data` chunk.
pub(crate) fn open_wav<R: Read + Seek + Send>(mut inner: R) -> Result<CbrReader<R>, ContainerError> {
    let mut riff = [0u8; 12];
    inner
        .read_exact(&mut riff)
        .map_err(|e| eof_as_malformed(e, "file too short for a RIFF header"))?;
    if &riff[..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(ContainerError::unsupported("not a RIFF WAVE file"));
    }

    let mut fmt: Option<FmtChunk> = None;
    let mut fact_frames: Option<u32> = None;
    let mut data: Option<(u64, u64)> = None;

    while let Some((id, size)) = read_chunk_header(&mut inner, false)? {
        match &id {
            b"fmt " => fmt = Some(FmtChunk::parse(&read_chunk_body(&mut inner, size)?)?),
            b"fact" => {
                let body = read_chunk_body(&mut inner, size)?;
                if body.len() >= 4 {
                    fact_frames = Some(u32_le(&body, 0));
                }
            }
            b"data" => {
                let offset = inner.stream_position()?;
                let file_len = inner.seek(SeekFrom::End(0))?;
                let len = if size == u32::MAX {
                    // Unfinalized streaming writers leave the size at its maximum.
                    file_len.saturating_sub(offset)
                } else {
                    u64::from(size)
                };
                data = Some((offset, len));
                if fmt.is_some() {
                    break;
                }
                inner.seek(SeekFrom::Start(offset))?;
                skip_chunk(&mut inner, size)?;
            }
            _ => skip_chunk(&mut inner, size)?,
        }
    }

    let fmt = fmt.ok_or_else(|| ContainerError::malformed("missing fmt chunk"))?;
    let (offset, len) = data.ok_or_else(|| ContainerError::malformed("missing data chunk"))?;
    let format = fmt.to_descriptor()?;

    let bytes_per_packet = u64::from(format.bytes_per_packet);
    let packets = len / bytes_per_packet;
    if len % bytes_per_packet != 0 {
        warn!(
            trailing_bytes = len % bytes_per_packet,
            "Ignoring partial packet at the end of WAV data"
        );
    }
    let frames_per_packet = u64::from(format.frames_per_packet);
    let frames = match (format.frames_per_packet, fact_frames) {
        (1, _) | (_, None) => packets * frames_per_packet,
        (_, Some(fact)) => u64::from(fact).min(packets * frames_per_packet),
    };

    debug!(format = %format, packets, frames, "Parsed WAV header");
    Ok(CbrReader::new(
        inner,
        format,
        PacketRegion {
            offset,
            len,
            packets,
            frames,
        },
    ))
}

fn format_tag(format: &FormatDescriptor) -> Result<u16, ContainerError> {
    match format.codec {
        CodecId::LinearPcm {
            big_endian: true, ..
        } => Err(ContainerError::unsupported("WAV stores little-endian samples only")),
        CodecId::LinearPcm { float: true, .. } => Ok(TAG_FLOAT),
        CodecId::LinearPcm { signed, .. } => {
            if (format.bits_per_channel == 8) == signed {
                Err(ContainerError::unsupported(
                    "WAV stores 8-bit PCM unsigned and wider PCM signed",
                ))
            } else {
                Ok(TAG_PCM)
            }
        }
        CodecId::ALaw => Ok(TAG_ALAW),
        CodecId::MuLaw => Ok(TAG_ULAW),
        CodecId::ImaAdpcm => Ok(TAG_IMA_ADPCM),
    }
}

/// Streaming WAV writer.
pub(crate) struct WavWriter<W: Write + Seek> {
    inner: W,
    riff_size_at: u64,
    fact_at: Option<u64>,
    data_size_at: u64,
    data_bytes: u64,
    frames: u64,
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn create(mut inner: W, format: &FormatDescriptor) -> Result<Self, ContainerError> {
        let tag = format_tag(format)?;
        let extensible = matches!(tag, TAG_PCM | TAG_FLOAT)
            && (format.channel_layout.is_some() || format.channels > 2);
        let block_align = format.bytes_per_packet as u16;
        let byte_rate = (format.sample_rate as u64 * u64::from(format.bytes_per_packet)
            / u64::from(format.frames_per_packet)) as u32;

        let mut fmt = Vec::with_capacity(40);
        fmt.extend_from_slice(&(if extensible { TAG_EXTENSIBLE } else { tag }).to_le_bytes());
        fmt.extend_from_slice(&(format.channels as u16).to_le_bytes());
        fmt.extend_from_slice(&(format.sample_rate as u32).to_le_bytes());
        fmt.extend_from_slice(&byte_rate.to_le_bytes());
        fmt.extend_from_slice(&block_align.to_le_bytes());
        fmt.extend_from_slice(&(format.bits_per_channel as u16).to_le_bytes());
        if extensible {
            let mask = format.channel_layout.map(|l| l.speaker_mask()).unwrap_or(0);
            fmt.extend_from_slice(&22u16.to_le_bytes());
            fmt.extend_from_slice(&(format.bits_per_channel as u16).to_le_bytes());
            fmt.extend_from_slice(&mask.to_le_bytes());
            fmt.extend_from_slice(&tag.to_le_bytes());
            fmt.extend_from_slice(&SUBTYPE_GUID_TAIL);
        } else if tag == TAG_IMA_ADPCM {
            fmt.extend_from_slice(&2u16.to_le_bytes());
            fmt.extend_from_slice(&(format.frames_per_packet as u16).to_le_bytes());
        } else if tag != TAG_PCM {
            fmt.extend_from_slice(&0u16.to_le_bytes());
        }

        inner.write_all(b"RIFF")?;
        inner.write_all(&0u32.to_le_bytes())?;
        inner.write_all(b"WAVE")?;
        inner.write_all(b"fmt ")?;
        inner.write_all(&(fmt.len() as u32).to_le_bytes())?;
        inner.write_all(&fmt)?;

        let mut position = 12 + 8 + fmt.len() as u64;
        let fact_at = if tag != TAG_PCM {
            inner.write_all(b"fact")?;
            inner.write_all(&4u32.to_le_bytes())?;
            inner.write_all(&0u32.to_le_bytes())?;
            position += 12;
            Some(position - 4)
        } else {
            None
        };

        inner.write_all(b"data")?;
        inner.write_all(&0u32.to_le_bytes())?;

        Ok(Self {
            inner,
            riff_size_at: 4,
            fact_at,
            data_size_at: position + 4,
            data_bytes: 0,
            frames: 0,
        })
    }
}

impl<W: Write + Seek + Send> ContainerWriter for WavWriter<W> {
    fn write_packets(
        &mut self,
        data: &[u8],
        _packets: u32,
        frames: u32,
    ) -> Result<(), ContainerError> {
        let total = self.data_size_at + 4 + self.data_bytes + data.len() as u64;
        if total > u64::from(u32::MAX) {
            return Err(ContainerError::Io(io::Error::other(
                "WAV data would exceed the 4 GiB RIFF limit",
            )));
        }
        self.inner.write_all(data)?;
        self.data_bytes += data.len() as u64;
        self.frames += u64::from(frames);
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), ContainerError> {
        if self.data_bytes % 2 == 1 {
            self.inner.write_all(&[0])?;
        }
        let end = self.inner.seek(SeekFrom::End(0))?;
        patch_u32(&mut self.inner, self.riff_size_at, (end - 8) as u32, false)?;
        if let Some(at) = self.fact_at {
            patch_u32(&mut self.inner, at, self.frames.min(u64::from(u32::MAX)) as u32, false)?;
        }
        patch_u32(&mut self.inner, self.data_size_at, self.data_bytes as u32, false)?;
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_to_vec(format: &FormatDescriptor, payload: &[u8], frames: u32) -> Vec<u8> {
        let mut writer = WavWriter::create(Cursor::new(Vec::new()), format).unwrap();
        let packets = payload.len() as u32 / format.bytes_per_packet.max(1);
        writer.write_packets(payload, packets, frames).unwrap();
        writer.finalize().unwrap();
        writer.inner.into_inner()
    }

    #[test]
    fn test_pcm_header_layout() {
        let format = FormatDescriptor::linear_pcm(44_100.0, 2, 16);
        let bytes = write_to_vec(&format, &[1, 2, 3, 4, 5, 6, 7, 8], 2);

        assert_eq!(bytes.len(), 44 + 8);
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(u32_le(&bytes, 4), 44);
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_le(&bytes, 16), 16);
        assert_eq!(u16_le(&bytes, 20), TAG_PCM);
        assert_eq!(u32_le(&bytes, 28), 176_400);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_le(&bytes, 40), 8);
    }

    #[test]
    fn test_pcm_round_trip() {
        let format = FormatDescriptor::linear_pcm(22_050.0, 1, 16);
        let payload: Vec<u8> = (0..200u8).collect();
        let bytes = write_to_vec(&format, &payload, 100);

        let mut reader = open_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.format(), &format);
        assert_eq!(reader.total_frames(), 100);

        let mut buf = Vec::new();
        let read = reader.read_packets(0, 1000, &mut buf).unwrap();
        assert_eq!(read.packets, 100);
        assert_eq!(buf, payload);
    }

    #[test]
    fn test_odd_payload_is_padded() {
        let format = FormatDescriptor::linear_pcm(8_000.0, 1, 8).with_unsigned();
        let bytes = write_to_vec(&format, &[0x80, 0x81, 0x82], 3);
        assert_eq!(bytes.len(), 44 + 4);
        assert_eq!(u32_le(&bytes, 40), 3);
        assert_eq!(u32_le(&bytes, 4), 40);

        let reader = open_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.total_frames(), 3);
    }

    #[test]
    fn test_adpcm_fact_chunk_carries_frame_count() {
        let format = FormatDescriptor::ima_adpcm(8_000.0, 1, 9);
        let bytes = write_to_vec(&format, &[0u8; 16], 11);

        let reader = open_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.format(), &format);
        assert_eq!(reader.total_packets(), 2);
        assert_eq!(reader.total_frames(), 11);
    }

    #[test]
    fn test_extensible_layout_round_trip() {
        let format = FormatDescriptor::linear_pcm(48_000.0, 6, 24)
            .with_channel_layout(ChannelLayoutTag::Surround51);
        let bytes = write_to_vec(&format, &[0u8; 36], 2);
        assert_eq!(u16_le(&bytes, 20), TAG_EXTENSIBLE);

        let reader = open_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.format(), &format);
    }

    #[test]
    fn test_float_and_law_formats_round_trip() {
        for format in [
            FormatDescriptor::float_pcm(44_100.0, 2, 32),
            FormatDescriptor::mu_law(8_000.0, 1),
            FormatDescriptor::a_law(8_000.0, 1),
        ] {
            let payload = vec![0u8; format.bytes_per_packet as usize * 4];
            let bytes = write_to_vec(&format, &payload, 4);
            let reader = open_wav(Cursor::new(bytes)).unwrap();
            assert_eq!(reader.format(), &format);
            assert_eq!(reader.total_frames(), 4);
        }
    }

    #[test]
    fn test_skips_unknown_chunks() {
        let format = FormatDescriptor::linear_pcm(8_000.0, 1, 16);
        let bytes = write_to_vec(&format, &[1, 0, 2, 0], 2);

        // Insert a LIST chunk with an odd size between fmt and data.
        let mut patched = bytes[..36].to_vec();
        patched.extend_from_slice(b"LIST\x03\x00\x00\x00abc\x00");
        patched.extend_from_slice(&bytes[36..]);

        let mut reader = open_wav(Cursor::new(patched)).unwrap();
        let mut buf = Vec::new();
        reader.read_packets(0, 2, &mut buf).unwrap();
        assert_eq!(buf, vec![1, 0, 2, 0]);
    }

    #[test]
    fn test_rejects_non_wave() {
        let err = open_wav(Cursor::new(b"FORM\x00\x00\x00\x04AIFF".to_vec())).err();
        assert!(matches!(err, Some(ContainerError::Unsupported { .. })));

        let err = open_wav(Cursor::new(b"RIFF".to_vec())).err();
        assert!(matches!(err, Some(ContainerError::Malformed { .. })));
    }

    #[test]
    fn test_rejects_missing_data_chunk() {
        let format = FormatDescriptor::linear_pcm(8_000.0, 1, 16);
        let bytes = write_to_vec(&format, &[], 0);
        let err = open_wav(Cursor::new(bytes[..36].to_vec())).err();
        assert!(matches!(err, Some(ContainerError::Malformed { .. })));
    }

    #[test]
    fn test_check_format() {
        let backend = WavBackend;
        assert!(backend
            .check_format(&FormatDescriptor::linear_pcm(44_100.0, 2, 16))
            .is_ok());
        assert!(backend
            .check_format(&FormatDescriptor::linear_pcm(44_100.0, 2, 16).with_big_endian(true))
            .is_err());
        assert!(backend
            .check_format(&FormatDescriptor::linear_pcm(44_100.0, 1, 8))
            .is_err());
        assert!(backend
            .check_format(&FormatDescriptor::linear_pcm(44_100.5, 1, 16))
            .is_err());
    }

    #[test]
    fn test_sniff() {
        let backend = WavBackend;
        assert!(backend.sniff(b"RIFF\x24\x00\x00\x00WAVEfmt "));
        assert!(!backend.sniff(b"FORM\x24\x00\x00\x00AIFF"));
        assert!(!backend.sniff(b"RIFF"));
    }
}
