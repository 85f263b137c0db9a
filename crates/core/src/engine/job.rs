//! Open, convert and close in one call.

use tracing::info;

use crate::config::JobConfig;
use crate::endpoint::StreamEndpoint;

use super::config::ConverterConfig;
use super::conversion::ConversionEngine;
use super::error::ConversionError;
use super::types::{CancellationFlag, ConversionProgress, ConversionReport};

/// Runs one job from `job`.
///
/// The input is opened first, so a missing input never creates the output.
/// Both endpoints are closed before returning, whatever the outcome; a
/// cancelled or failed conversion leaves a finalized, partial output file.
pub fn run_job(
    job: &JobConfig,
    config: &ConverterConfig,
    cancel: Option<CancellationFlag>,
) -> Result<ConversionReport, ConversionError> {
    run_job_with_progress(job, config, cancel, |_| {})
}

/// Like [`run_job`], calling `on_progress` between batches.
pub fn run_job_with_progress(
    job: &JobConfig,
    config: &ConverterConfig,
    cancel: Option<CancellationFlag>,
    on_progress: impl FnMut(&ConversionProgress),
) -> Result<ConversionReport, ConversionError> {
    let mut input = StreamEndpoint::open(&job.input)?;

    let container = job.output_container().ok_or_else(|| {
        ConversionError::unsupported(format!(
            "cannot infer a container type from {}",
            job.output.display()
        ))
    })?;
    let target = job.format.resolve(input.format(), container);
    info!(
        input = %job.input.display(),
        output = %job.output.display(),
        container = %container,
        target = %target,
        "Resolved output format"
    );

    let mut output = StreamEndpoint::create(&job.output, container, target)?;

    let result = {
        let mut engine = ConversionEngine::with_config(&mut input, &mut output, config.clone())
            .on_progress(on_progress);
        if let Some(flag) = cancel {
            engine = engine.with_cancellation(flag);
        }
        engine.convert()
    };

    output.close();
    input.close();
    result
}
