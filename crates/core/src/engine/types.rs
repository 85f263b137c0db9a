//! Types for the engine module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::format::FormatDescriptor;

/// Lifecycle state of a conversion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Constructed, nothing read yet.
    Idle,
    /// Moving packets from input to output.
    Running,
    /// Input exhausted, flushing buffered frames.
    Draining,
    /// All frames written.
    Complete,
    /// Stopped by an error.
    Failed,
}

impl EngineState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared flag asking a running conversion to stop at the next batch boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of a conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    /// Job ID.
    pub job_id: String,
    /// Source stream format.
    pub input_format: FormatDescriptor,
    /// Destination stream format.
    pub output_format: FormatDescriptor,
    /// Whether packets were copied without decoding.
    pub passthrough: bool,
    pub packets_read: u64,
    pub frames_read: u64,
    pub packets_written: u64,
    pub frames_written: u64,
    /// Read/convert/write iterations, excluding the final flush.
    pub batches: u64,
    /// Packets requested per read.
    pub packets_per_read: u32,
    /// Working buffer capacity in bytes.
    pub working_buffer_bytes: usize,
    /// Largest single write in bytes.
    pub peak_batch_bytes: usize,
    /// Packets produced by the final flush.
    pub flushed_packets: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall time spent converting in milliseconds.
    pub elapsed_ms: u64,
}

impl ConversionReport {
    pub(crate) fn new(
        job_id: String,
        input_format: FormatDescriptor,
        output_format: FormatDescriptor,
    ) -> Self {
        Self {
            job_id,
            input_format,
            output_format,
            passthrough: false,
            packets_read: 0,
            frames_read: 0,
            packets_written: 0,
            frames_written: 0,
            batches: 0,
            packets_per_read: 0,
            working_buffer_bytes: 0,
            peak_batch_bytes: 0,
            flushed_packets: 0,
            started_at: None,
            finished_at: None,
            elapsed_ms: 0,
        }
    }

    /// Duration of the converted stream in seconds.
    pub fn output_duration_secs(&self) -> f64 {
        self.frames_written as f64 / self.output_format.sample_rate
    }
}

/// Progress update emitted between batches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionProgress {
    /// Job ID.
    pub job_id: String,
    pub frames_read: u64,
    pub frames_written: u64,
    /// Frames in the source stream.
    pub total_frames: u64,
    /// Progress percentage (0.0 - 100.0).
    pub percent: f32,
}

impl ConversionProgress {
    pub(crate) fn new(job_id: &str, frames_read: u64, frames_written: u64, total_frames: u64) -> Self {
        let percent = if total_frames == 0 {
            100.0
        } else {
            (frames_read as f64 / total_frames as f64 * 100.0).min(100.0) as f32
        };
        Self {
            job_id: job_id.to_string(),
            frames_read,
            frames_written,
            total_frames,
            percent,
        }
    }
}
