//! Byte-level helpers shared by the container parsers.

use std::io::{self, Read, Seek, SeekFrom, Write};

use super::error::ContainerError;

/// Reads a chunk header (four-character id and 32-bit size).
///
/// Returns `None` on a clean end of file before the header.
pub(crate) fn read_chunk_header<R: Read>(
    reader: &mut R,
    big_endian: bool,
) -> Result<Option<([u8; 4], u32)>, ContainerError> {
    let mut header = [0u8; 8];
    let mut filled = 0;
    while filled < header.len() {
        let read = reader.read(&mut header[filled..])?;
        if read == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ContainerError::malformed("truncated chunk header"));
        }
        filled += read;
    }
    let id = [header[0], header[1], header[2], header[3]];
    let size_bytes = [header[4], header[5], header[6], header[7]];
    let size = if big_endian {
        u32::from_be_bytes(size_bytes)
    } else {
        u32::from_le_bytes(size_bytes)
    };
    Ok(Some((id, size)))
}

/// Skips a chunk body, including the pad byte of odd-sized chunks.
pub(crate) fn skip_chunk<R: Seek>(reader: &mut R, size: u32) -> io::Result<()> {
    let padded = i64::from(size) + i64::from(size & 1);
    reader.seek(SeekFrom::Current(padded))?;
    Ok(())
}

/// Reads a whole chunk body into memory, consuming the pad byte.
///
/// A size reaching past the end of the stream is malformed and is rejected
/// before anything is allocated.
pub(crate) fn read_chunk_body<R: Read + Seek>(
    reader: &mut R,
    size: u32,
) -> Result<Vec<u8>, ContainerError> {
    let start = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(start))?;
    let remaining = end.saturating_sub(start);
    if u64::from(size) > remaining {
        return Err(ContainerError::malformed(format!(
            "chunk declares {} bytes but only {} remain",
            size, remaining
        )));
    }

    let mut body = vec![0u8; size as usize];
    reader
        .read_exact(&mut body)
        .map_err(|e| eof_as_malformed(e, "truncated chunk body"))?;
    if size & 1 == 1 {
        reader.seek(SeekFrom::Current(1))?;
    }
    Ok(body)
}

/// Maps an early end of file while parsing headers to a malformed container.
pub(crate) fn eof_as_malformed(err: io::Error, reason: &str) -> ContainerError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ContainerError::malformed(reason)
    } else {
        ContainerError::Io(err)
    }
}

/// Overwrites a 32-bit field at `offset` and returns to the end of the stream.
pub(crate) fn patch_u32<W: Write + Seek>(
    writer: &mut W,
    offset: u64,
    value: u32,
    big_endian: bool,
) -> io::Result<()> {
    writer.seek(SeekFrom::Start(offset))?;
    if big_endian {
        writer.write_all(&value.to_be_bytes())?;
    } else {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.seek(SeekFrom::End(0))?;
    Ok(())
}

pub(crate) fn u16_le(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

pub(crate) fn u32_le(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

pub(crate) fn u16_be(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

pub(crate) fn u32_be(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Encodes a value as an 80-bit IEEE 754 extended precision float.
pub(crate) fn f64_to_extended(value: f64) -> [u8; 10] {
    let mut out = [0u8; 10];
    if value == 0.0 || !value.is_normal() {
        return out;
    }
    let bits = value.to_bits();
    let sign = ((bits >> 63) as u16) << 15;
    let exponent = ((bits >> 52) & 0x7FF) as i32 - 1023;
    let mantissa = (1u64 << 63) | ((bits & ((1u64 << 52) - 1)) << 11);
    let biased = sign | (exponent + 16_383) as u16;
    out[..2].copy_from_slice(&biased.to_be_bytes());
    out[2..].copy_from_slice(&mantissa.to_be_bytes());
    out
}

/// Decodes an 80-bit IEEE 754 extended precision float.
pub(crate) fn extended_to_f64(bytes: &[u8]) -> f64 {
    let head = u16_be(bytes, 0);
    let negative = head & 0x8000 != 0;
    let biased = i32::from(head & 0x7FFF);
    let mut mantissa_bytes = [0u8; 8];
    mantissa_bytes.copy_from_slice(&bytes[2..10]);
    let mantissa = u64::from_be_bytes(mantissa_bytes);
    if biased == 0 && mantissa == 0 {
        return 0.0;
    }
    let value = mantissa as f64 * 2f64.powi(biased - 16_383 - 63);
    if negative {
        -value
    } else {
        value
    }
}
