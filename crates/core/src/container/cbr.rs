//! Reader for containers storing constant-size packets in one contiguous region.

use std::io::{self, Read, Seek, SeekFrom};

use crate::format::FormatDescriptor;

use super::error::ContainerError;
use super::traits::ContainerReader;
use super::types::PacketRead;

/// Location of the packet payload inside a container file.
#[derive(Debug, Clone)]
pub(crate) struct PacketRegion {
    /// Byte offset of the first packet.
    pub offset: u64,
    /// Bytes available in the region.
    pub len: u64,
    /// Packets declared by the container metadata.
    pub packets: u64,
    /// Frames declared by the container metadata.
    pub frames: u64,
}

/// Constant bit rate packet reader.
///
/// Packets declared by the metadata but missing from the file surface as
/// `UnexpectedEof` errors when read.
pub(crate) struct CbrReader<R> {
    inner: R,
    format: FormatDescriptor,
    region: PacketRegion,
    /// Packet index the inner reader is positioned at, if known.
    position: Option<u64>,
}

impl<R: Read + Seek> CbrReader<R> {
    pub fn new(inner: R, format: FormatDescriptor, region: PacketRegion) -> Self {
        Self {
            inner,
            format,
            region,
            position: None,
        }
    }
}

impl<R: Read + Seek + Send> ContainerReader for CbrReader<R> {
    fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    fn total_packets(&self) -> u64 {
        self.region.packets
    }

    fn total_frames(&self) -> u64 {
        self.region.frames
    }

    fn read_packets(
        &mut self,
        start_packet: u64,
        max_packets: u32,
        buf: &mut Vec<u8>,
    ) -> Result<PacketRead, ContainerError> {
        buf.clear();
        if start_packet >= self.region.packets || max_packets == 0 {
            return Ok(PacketRead::default());
        }

        let bytes_per_packet = u64::from(self.format.bytes_per_packet);
        let count = (self.region.packets - start_packet).min(u64::from(max_packets));
        let start_byte = start_packet * bytes_per_packet;
        let end_byte = start_byte + count * bytes_per_packet;
        if end_byte > self.region.len {
            self.position = None;
            return Err(ContainerError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "packet data ends at byte {} but packet {} needs byte {}",
                    self.region.len,
                    start_packet + count - 1,
                    end_byte
                ),
            )));
        }

        if self.position != Some(start_packet) {
            self.inner
                .seek(SeekFrom::Start(self.region.offset + start_byte))?;
        }
        buf.resize((end_byte - start_byte) as usize, 0);
        if let Err(e) = self.inner.read_exact(buf) {
            self.position = None;
            buf.clear();
            return Err(e.into());
        }
        self.position = Some(start_packet + count);

        let frames_per_packet = u64::from(self.format.frames_per_packet);
        let frames_before = start_packet * frames_per_packet;
        let frames = (count * frames_per_packet)
            .min(self.region.frames.saturating_sub(frames_before));

        Ok(PacketRead {
            packets: count as u32,
            frames: frames as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(payload: Vec<u8>, region: PacketRegion, format: FormatDescriptor) -> CbrReader<Cursor<Vec<u8>>> {
        CbrReader::new(Cursor::new(payload), format, region)
    }

    #[test]
    fn test_reads_in_batches_until_end() {
        let format = FormatDescriptor::linear_pcm(8_000.0, 1, 16);
        let payload: Vec<u8> = (0..20).collect();
        let region = PacketRegion {
            offset: 4,
            len: 16,
            packets: 8,
            frames: 8,
        };
        let mut reader = reader(payload, region, format);
        let mut buf = Vec::new();

        let read = reader.read_packets(0, 5, &mut buf).unwrap();
        assert_eq!(read, PacketRead { packets: 5, frames: 5 });
        assert_eq!(&buf[..2], &[4, 5]);

        let read = reader.read_packets(5, 5, &mut buf).unwrap();
        assert_eq!(read, PacketRead { packets: 3, frames: 3 });
        assert_eq!(buf, vec![14, 15, 16, 17, 18, 19]);

        let read = reader.read_packets(8, 5, &mut buf).unwrap();
        assert!(read.is_end_of_stream());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_last_compressed_packet_is_short() {
        let format = FormatDescriptor::ima_adpcm(8_000.0, 1, 9);
        let region = PacketRegion {
            offset: 0,
            len: 24,
            packets: 3,
            frames: 20,
        };
        let mut reader = reader(vec![0u8; 24], region, format);
        let mut buf = Vec::new();

        let read = reader.read_packets(0, 2, &mut buf).unwrap();
        assert_eq!(read.frames, 18);
        let read = reader.read_packets(2, 2, &mut buf).unwrap();
        assert_eq!(read, PacketRead { packets: 1, frames: 2 });
    }

    #[test]
    fn test_truncated_region_is_an_error() {
        let format = FormatDescriptor::linear_pcm(8_000.0, 2, 16);
        let region = PacketRegion {
            offset: 0,
            len: 10,
            packets: 4,
            frames: 4,
        };
        let mut reader = reader(vec![0u8; 10], region, format);
        let mut buf = Vec::new();

        assert!(reader.read_packets(0, 2, &mut buf).is_ok());
        let err = reader.read_packets(2, 2, &mut buf).unwrap_err();
        assert!(matches!(err, ContainerError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_missing_file_bytes_are_an_error() {
        let format = FormatDescriptor::linear_pcm(8_000.0, 1, 16);
        let region = PacketRegion {
            offset: 0,
            len: 16,
            packets: 8,
            frames: 8,
        };
        let mut reader = reader(vec![0u8; 6], region, format);
        let mut buf = Vec::new();
        assert!(reader.read_packets(0, 8, &mut buf).is_err());
        assert!(buf.is_empty());
    }
}
