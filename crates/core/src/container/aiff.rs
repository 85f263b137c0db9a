//! AIFF and AIFF-C backend.
//!
//! Plain AIFF carries big-endian signed integer PCM. AIFF-C adds a compression
//! code in the `COMM` chunk; the codes understood here are `NONE`/`twos`,
//! `sowt` (little-endian), `fl32`/`fl64` and the G.711 `ulaw`/`alaw` pair.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};

use tracing::{debug, warn};

use crate::codec;
use crate::format::{CodecId, FormatDescriptor};

use super::bytes::{
    eof_as_malformed, extended_to_f64, f64_to_extended, patch_u32, read_chunk_body,
    read_chunk_header, skip_chunk, u16_be, u32_be,
};
use super::cbr::{CbrReader, PacketRegion};
use super::error::ContainerError;
use super::traits::{ContainerBackend, ContainerReader, ContainerWriter};
use super::types::ContainerType;

/// AIFF-C version 1 timestamp carried in the `FVER` chunk.
const AIFC_VERSION_1: u32 = 0xA280_5140;

/// Backend for `.aiff` or `.aifc` files.
#[derive(Debug, Clone, Copy)]
pub struct AiffBackend {
    container: ContainerType,
}

impl AiffBackend {
    /// Plain AIFF.
    pub fn aiff() -> Self {
        Self {
            container: ContainerType::Aiff,
        }
    }

    /// AIFF-C.
    pub fn aifc() -> Self {
        Self {
            container: ContainerType::Aifc,
        }
    }

    fn form_type(&self) -> &'static [u8; 4] {
        if self.container == ContainerType::Aifc {
            b"AIFC"
        } else {
            b"AIFF"
        }
    }
}

impl ContainerBackend for AiffBackend {
    fn container_type(&self) -> ContainerType {
        self.container
    }

    fn sniff(&self, header: &[u8]) -> bool {
        header.len() >= 12 && &header[..4] == b"FORM" && &header[8..12] == self.form_type()
    }

    fn check_format(&self, format: &FormatDescriptor) -> Result<(), ContainerError> {
        codec::check_supported(format).map_err(|e| ContainerError::unsupported(e.to_string()))?;
        let code = compression_code(format)?;
        if self.container == ContainerType::Aiff && &code != b"NONE" {
            return Err(ContainerError::unsupported(format!(
                "AIFF stores big-endian signed integer PCM only, got {}",
                format.describe()
            )));
        }
        if format.channels > u32::from(u16::MAX) {
            return Err(ContainerError::unsupported("channel count exceeds AIFF limits"));
        }
        Ok(())
    }

    fn open_reader(&self, file: File) -> Result<Box<dyn ContainerReader>, ContainerError> {
        Ok(Box::new(open_aiff(BufReader::new(file))?))
    }

    fn create_writer(
        &self,
        file: File,
        format: &FormatDescriptor,
    ) -> Result<Box<dyn ContainerWriter>, ContainerError> {
        self.check_format(format)?;
        Ok(Box::new(AiffWriter::create(
            BufWriter::new(file),
            format,
            self.container,
        )?))
    }
}

fn compression_code(format: &FormatDescriptor) -> Result<[u8; 4], ContainerError> {
    match format.codec {
        CodecId::LinearPcm {
            float: false,
            signed: false,
            ..
        } => Err(ContainerError::unsupported("AIFF has no unsigned PCM")),
        CodecId::LinearPcm {
            float: false,
            big_endian: true,
            ..
        } => Ok(*b"NONE"),
        CodecId::LinearPcm { float: false, .. } => Ok(*b"sowt"),
        CodecId::LinearPcm {
            float: true,
            big_endian: false,
            ..
        } => Err(ContainerError::unsupported("AIFF-C stores big-endian floats only")),
        CodecId::LinearPcm { float: true, .. } => {
            if format.bits_per_channel == 64 {
                Ok(*b"fl64")
            } else {
                Ok(*b"fl32")
            }
        }
        CodecId::MuLaw => Ok(*b"ulaw"),
        CodecId::ALaw => Ok(*b"alaw"),
        CodecId::ImaAdpcm => Err(ContainerError::unsupported(
            "IMA ADPCM is only supported in WAV",
        )),
    }
}

fn compression_name(code: &[u8; 4]) -> &'static str {
    match code {
        b"NONE" => "not compressed",
        b"fl32" => "32-bit floating point",
        b"fl64" => "64-bit floating point",
        b"ulaw" => "uLaw 2:1",
        b"alaw" => "aLaw 2:1",
        _ => "",
    }
}

/// Contents of the `COMM` chunk.
#[derive(Debug, Clone)]
struct CommChunk {
    channels: u16,
    frames: u32,
    bits: u16,
    sample_rate: f64,
    compression: [u8; 4],
}

impl CommChunk {
    fn parse(body: &[u8], aifc: bool) -> Result<Self, ContainerError> {
        let min = if aifc { 22 } else { 18 };
        if body.len() < min {
            return Err(ContainerError::malformed(format!(
                "COMM chunk is {} bytes, expected at least {}",
                body.len(),
                min
            )));
        }
        let compression = if aifc {
            [body[18], body[19], body[20], body[21]]
        } else {
            *b"NONE"
        };
        Ok(Self {
            channels: u16_be(body, 0),
            frames: u32_be(body, 2),
            bits: u16_be(body, 6),
            sample_rate: extended_to_f64(&body[8..18]),
            compression,
        })
    }

    fn to_descriptor(&self) -> Result<FormatDescriptor, ContainerError> {
        let rate = self.sample_rate;
        let channels = u32::from(self.channels);
        // Samples narrower than their container are stored left-justified.
        let bits = (u32::from(self.bits) + 7) / 8 * 8;

        let format = match &self.compression {
            b"NONE" | b"twos" => {
                FormatDescriptor::linear_pcm(rate, channels, bits).with_big_endian(true)
            }
            b"sowt" => FormatDescriptor::linear_pcm(rate, channels, bits),
            b"fl32" | b"FL32" => FormatDescriptor::float_pcm(rate, channels, 32).with_big_endian(true),
            b"fl64" | b"FL64" => FormatDescriptor::float_pcm(rate, channels, 64).with_big_endian(true),
            b"ulaw" | b"ULAW" => FormatDescriptor::mu_law(rate, channels),
            b"alaw" | b"ALAW" => FormatDescriptor::a_law(rate, channels),
            other => {
                return Err(ContainerError::unsupported(format!(
                    "AIFF-C compression type '{}'",
                    String::from_utf8_lossy(other)
                )))
            }
        };
        format
            .validate()
            .map_err(|e| ContainerError::unsupported(e.to_string()))?;
        codec::check_supported(&format).map_err(|e| ContainerError::unsupported(e.to_string()))?;
        Ok(format)
    }
}

/// Parses the FORM header and positions a packet reader over the `SSND` data.
pub(crate) fn open_aiff<R: Read + Seek + Send>(mut inner: R) -> Result<CbrReader<R>, ContainerError> {
    let mut form = [0u8; 12];
    inner
        .read_exact(&mut form)
        .map_err(|e| eof_as_malformed(e, "file too short for a FORM header"))?;
    if &form[..4] != b"FORM" {
        return Err(ContainerError::unsupported("not an IFF FORM file"));
    }
    let aifc = match &form[8..12] {
        b"AIFF" => false,
        b"AIFC" => true,
        _ => return Err(ContainerError::unsupported("FORM is neither AIFF nor AIFC")),
    };

    let mut comm: Option<CommChunk> = None;
    let mut ssnd: Option<(u64, u64)> = None;

    while let Some((id, size)) = read_chunk_header(&mut inner, true)? {
        match &id {
            b"COMM" => comm = Some(CommChunk::parse(&read_chunk_body(&mut inner, size)?, aifc)?),
            b"SSND" => {
                if size < 8 {
                    return Err(ContainerError::malformed("SSND chunk shorter than its header"));
                }
                let start = inner.stream_position()?;
                let mut header = [0u8; 8];
                inner
                    .read_exact(&mut header)
                    .map_err(|e| eof_as_malformed(e, "truncated SSND header"))?;
                let data_offset = u64::from(u32_be(&header, 0));
                let len = u64::from(size - 8).saturating_sub(data_offset);
                ssnd = Some((start + 8 + data_offset, len));
                if comm.is_some() {
                    break;
                }
                inner.seek(io::SeekFrom::Start(start))?;
                skip_chunk(&mut inner, size)?;
            }
            _ => skip_chunk(&mut inner, size)?,
        }
    }

    let comm = comm.ok_or_else(|| ContainerError::malformed("missing COMM chunk"))?;
    let format = comm.to_descriptor()?;
    let frames = u64::from(comm.frames);
    let (offset, len) = match ssnd {
        Some(region) => region,
        None if frames == 0 => (0, 0),
        None => return Err(ContainerError::malformed("missing SSND chunk")),
    };

    let needed = frames * u64::from(format.bytes_per_packet);
    if len > needed {
        warn!(
            trailing_bytes = len - needed,
            "Ignoring sound data past the frame count in COMM"
        );
    }

    debug!(format = %format, frames, "Parsed AIFF header");
    Ok(CbrReader::new(
        inner,
        format,
        PacketRegion {
            offset,
            len,
            packets: frames,
            frames,
        },
    ))
}

/// Streaming AIFF/AIFF-C writer.
pub(crate) struct AiffWriter<W: Write + Seek> {
    inner: W,
    frames_at: u64,
    ssnd_size_at: u64,
    data_bytes: u64,
    frames: u64,
}

impl<W: Write + Seek> AiffWriter<W> {
    pub fn create(
        mut inner: W,
        format: &FormatDescriptor,
        container: ContainerType,
    ) -> Result<Self, ContainerError> {
        let aifc = container == ContainerType::Aifc;
        let code = compression_code(format)?;

        let mut comm = Vec::with_capacity(64);
        comm.extend_from_slice(&(format.channels as u16).to_be_bytes());
        comm.extend_from_slice(&0u32.to_be_bytes());
        comm.extend_from_slice(&(format.bits_per_channel as u16).to_be_bytes());
        comm.extend_from_slice(&f64_to_extended(format.sample_rate));
        if aifc {
            let name = compression_name(&code);
            comm.extend_from_slice(&code);
            comm.push(name.len() as u8);
            comm.extend_from_slice(name.as_bytes());
            if (name.len() + 1) % 2 == 1 {
                comm.push(0);
            }
        }

        inner.write_all(b"FORM")?;
        inner.write_all(&0u32.to_be_bytes())?;
        inner.write_all(if aifc { b"AIFC" } else { b"AIFF" })?;
        let mut position = 12u64;
        if aifc {
            inner.write_all(b"FVER")?;
            inner.write_all(&4u32.to_be_bytes())?;
            inner.write_all(&AIFC_VERSION_1.to_be_bytes())?;
            position += 12;
        }

        inner.write_all(b"COMM")?;
        inner.write_all(&(comm.len() as u32).to_be_bytes())?;
        inner.write_all(&comm)?;
        let frames_at = position + 8 + 2;
        position += 8 + comm.len() as u64;

        inner.write_all(b"SSND")?;
        inner.write_all(&8u32.to_be_bytes())?;
        inner.write_all(&0u32.to_be_bytes())?;
        inner.write_all(&0u32.to_be_bytes())?;

        Ok(Self {
            inner,
            frames_at,
            ssnd_size_at: position + 4,
            data_bytes: 0,
            frames: 0,
        })
    }
}

impl<W: Write + Seek + Send> ContainerWriter for AiffWriter<W> {
    fn write_packets(
        &mut self,
        data: &[u8],
        _packets: u32,
        frames: u32,
    ) -> Result<(), ContainerError> {
        let total = self.ssnd_size_at + 12 + self.data_bytes + data.len() as u64;
        let frames_total = self.frames + u64::from(frames);
        if total > u64::from(u32::MAX) || frames_total > u64::from(u32::MAX) {
            return Err(ContainerError::Io(io::Error::other(
                "AIFF sound data would exceed the 4 GiB FORM limit",
            )));
        }
        self.inner.write_all(data)?;
        self.data_bytes += data.len() as u64;
        self.frames = frames_total;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), ContainerError> {
        if self.data_bytes % 2 == 1 {
            self.inner.write_all(&[0])?;
        }
        let end = self.inner.seek(io::SeekFrom::End(0))?;
        patch_u32(&mut self.inner, 4, (end - 8) as u32, true)?;
        patch_u32(&mut self.inner, self.frames_at, self.frames as u32, true)?;
        patch_u32(
            &mut self.inner,
            self.ssnd_size_at,
            (self.data_bytes + 8) as u32,
            true,
        )?;
        self.inner.flush()?;
        Ok(())
    }
}
