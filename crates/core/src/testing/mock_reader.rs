//! In-memory container reader for testing.

use std::io;
use std::sync::{Arc, Mutex};

use crate::container::{ContainerError, ContainerReader, PacketRead};
use crate::format::FormatDescriptor;

/// A recorded read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedRead {
    pub start_packet: u64,
    pub max_packets: u32,
}

#[derive(Debug, Default)]
struct ReaderState {
    reads: Vec<RecordedRead>,
    /// Fail every read starting at this packet index.
    fail_from_packet: Option<u64>,
}

/// Mock implementation of the ContainerReader trait.
///
/// Serves constant-size packets from a byte vector. Clones share the recorded
/// calls, so a test can keep one handle and hand a boxed clone to an endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use audioconv_core::testing::MockReader;
///
/// let reader = MockReader::new(format, payload);
/// reader.fail_from_packet(100);
///
/// let mut input = StreamEndpoint::from_reader(Box::new(reader.clone()))?;
/// // ...
/// assert_eq!(reader.read_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockReader {
    format: FormatDescriptor,
    data: Arc<Vec<u8>>,
    total_frames: u64,
    state: Arc<Mutex<ReaderState>>,
}

impl MockReader {
    /// Create a reader over whole packets of `format`.
    pub fn new(format: FormatDescriptor, data: Vec<u8>) -> Self {
        let packets = data.len() as u64 / u64::from(format.bytes_per_packet.max(1));
        let total_frames = packets * u64::from(format.frames_per_packet);
        Self {
            format,
            data: Arc::new(data),
            total_frames,
            state: Arc::new(Mutex::new(ReaderState::default())),
        }
    }

    /// Override the frame count reported by the metadata.
    pub fn with_total_frames(mut self, frames: u64) -> Self {
        self.total_frames = frames;
        self
    }

    /// Make every read touching `packet` or later fail with an I/O error.
    pub fn fail_from_packet(&self, packet: u64) {
        self.lock().fail_from_packet = Some(packet);
    }

    /// Get all recorded reads.
    pub fn recorded_reads(&self) -> Vec<RecordedRead> {
        self.lock().reads.clone()
    }

    /// Get the number of read calls.
    pub fn read_count(&self) -> usize {
        self.lock().reads.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReaderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn packets(&self) -> u64 {
        self.data.len() as u64 / u64::from(self.format.bytes_per_packet.max(1))
    }
}

impl ContainerReader for MockReader {
    fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    fn total_packets(&self) -> u64 {
        self.packets()
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn read_packets(
        &mut self,
        start_packet: u64,
        max_packets: u32,
        buf: &mut Vec<u8>,
    ) -> Result<PacketRead, ContainerError> {
        let fail_from = {
            let mut state = self.lock();
            state.reads.push(RecordedRead {
                start_packet,
                max_packets,
            });
            state.fail_from_packet
        };

        buf.clear();
        let total = self.packets();
        if start_packet >= total || max_packets == 0 {
            return Ok(PacketRead::default());
        }
        let count = (total - start_packet).min(u64::from(max_packets));
        if fail_from.is_some_and(|packet| start_packet + count > packet) {
            return Err(ContainerError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("injected read failure at packet {}", start_packet),
            )));
        }

        let bytes_per_packet = u64::from(self.format.bytes_per_packet);
        let start = (start_packet * bytes_per_packet) as usize;
        let end = ((start_packet + count) * bytes_per_packet) as usize;
        buf.extend_from_slice(&self.data[start..end]);

        let frames_per_packet = u64::from(self.format.frames_per_packet);
        let frames = (count * frames_per_packet)
            .min(self.total_frames.saturating_sub(start_packet * frames_per_packet));
        Ok(PacketRead {
            packets: count as u32,
            frames: frames as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_and_records() {
        let format = FormatDescriptor::linear_pcm(8_000.0, 1, 16);
        let mut reader = MockReader::new(format, (0..10u8).collect());
        let handle = reader.clone();
        let mut buf = Vec::new();

        let read = reader.read_packets(0, 3, &mut buf).unwrap();
        assert_eq!(read, PacketRead { packets: 3, frames: 3 });
        assert_eq!(buf, vec![0, 1, 2, 3, 4, 5]);
        let read = reader.read_packets(3, 3, &mut buf).unwrap();
        assert_eq!(read.packets, 2);
        assert!(reader.read_packets(5, 3, &mut buf).unwrap().is_end_of_stream());

        assert_eq!(handle.read_count(), 3);
        assert_eq!(
            handle.recorded_reads()[1],
            RecordedRead {
                start_packet: 3,
                max_packets: 3
            }
        );
    }

    #[test]
    fn test_injected_failure() {
        let format = FormatDescriptor::linear_pcm(8_000.0, 1, 16);
        let mut reader = MockReader::new(format, vec![0u8; 20]);
        reader.fail_from_packet(4);
        let mut buf = Vec::new();

        assert!(reader.read_packets(0, 4, &mut buf).is_ok());
        assert!(reader.read_packets(4, 4, &mut buf).is_err());
    }
}
