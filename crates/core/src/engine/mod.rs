//! Conversion engine.
//!
//! The engine pulls packets from an input [`StreamEndpoint`](crate::endpoint::StreamEndpoint),
//! converts them in memory and pushes the result to an output endpoint, one
//! bounded batch at a time.
//!
//! # Pipeline
//!
//! - Pass-through: packets are copied unchanged when both formats match exactly
//! - Otherwise: decode to `f64`, remap channels, resample, re-encode
//!
//! Resampling is linear interpolation. The output of an `n`-frame input always
//! has `floor(n * out_rate / in_rate)` frames.
//!
//! # Example
//!
//! ```ignore
//! use audioconv_core::engine::{ConversionEngine, ConverterConfig, CancellationFlag};
//!
//! let cancel = CancellationFlag::new();
//! let report = ConversionEngine::with_config(&mut input, &mut output, ConverterConfig::default())
//!     .with_cancellation(cancel.clone())
//!     .on_progress(|p| println!("{:.1}%", p.percent))
//!     .convert()?;
//! println!("{} frames written", report.frames_written);
//! ```

mod channels;
mod config;
mod conversion;
mod error;
mod job;
mod pipeline;
mod plan;
mod resampler;
mod types;

pub use config::{ConverterConfig, MIN_WORKING_BUFFER_BYTES};
pub use conversion::ConversionEngine;
pub use error::ConversionError;
pub use job::{run_job, run_job_with_progress};
pub use types::{CancellationFlag, ConversionProgress, ConversionReport, EngineState};
