//! In-memory container writer for testing.

use std::io;
use std::sync::{Arc, Mutex};

use crate::container::{ContainerError, ContainerWriter};

/// A recorded write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedWrite {
    pub bytes: usize,
    pub packets: u32,
    pub frames: u32,
}

#[derive(Debug, Default)]
struct WriterState {
    data: Vec<u8>,
    writes: Vec<RecordedWrite>,
    finalize_count: usize,
    /// Fail the write call with this index and every later one.
    fail_from_write: Option<usize>,
    fail_finalize: bool,
}

/// Mock implementation of the ContainerWriter trait.
///
/// Collects written packets in memory and records every call. Clones share
/// the recorded state.
#[derive(Debug, Clone, Default)]
pub struct MockWriter {
    state: Arc<Mutex<WriterState>>,
}

impl MockWriter {
    /// Create a new mock writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `index`-th write call (zero based) and all later ones fail.
    pub fn fail_from_write(&self, index: usize) {
        self.lock().fail_from_write = Some(index);
    }

    /// Make finalize fail.
    pub fn fail_finalize(&self) {
        self.lock().fail_finalize = true;
    }

    /// Get all bytes written so far.
    pub fn data(&self) -> Vec<u8> {
        self.lock().data.clone()
    }

    /// Get all recorded writes, including failed ones.
    pub fn recorded_writes(&self) -> Vec<RecordedWrite> {
        self.lock().writes.clone()
    }

    /// Get the number of write calls.
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// Get the number of finalize calls.
    pub fn finalize_count(&self) -> usize {
        self.lock().finalize_count
    }

    /// Total frames written.
    pub fn frames_written(&self) -> u64 {
        self.lock()
            .writes
            .iter()
            .map(|w| u64::from(w.frames))
            .sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ContainerWriter for MockWriter {
    fn write_packets(
        &mut self,
        data: &[u8],
        packets: u32,
        frames: u32,
    ) -> Result<(), ContainerError> {
        let mut state = self.lock();
        let index = state.writes.len();
        state.writes.push(RecordedWrite {
            bytes: data.len(),
            packets,
            frames,
        });
        if state.fail_from_write.is_some_and(|from| index >= from) {
            return Err(ContainerError::Io(io::Error::new(
                io::ErrorKind::StorageFull,
                "injected write failure",
            )));
        }
        state.data.extend_from_slice(data);
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), ContainerError> {
        let mut state = self.lock();
        state.finalize_count += 1;
        if state.fail_finalize {
            return Err(ContainerError::Io(io::Error::other("injected finalize failure")));
        }
        Ok(())
    }
}
