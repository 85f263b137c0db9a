//! The conversion engine state machine.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::endpoint::{EndpointError, EndpointRole, StreamEndpoint};

use super::config::ConverterConfig;
use super::error::ConversionError;
use super::pipeline::SampleConverter;
use super::plan::BatchPlan;
use super::types::{CancellationFlag, ConversionProgress, ConversionReport, EngineState};

type ProgressCallback<'a> = Box<dyn FnMut(&ConversionProgress) + 'a>;

/// Moves a stream from an input endpoint to an output endpoint.
///
/// The engine borrows both endpoints for its whole life, so neither can be used
/// or closed while a conversion is in flight. [`convert`](Self::convert) drives
/// the state machine `Idle -> Running -> Draining -> Complete`; any error moves
/// it to `Failed`. Both terminal states are sticky: later calls return the
/// stored report or error without touching either file.
///
/// ```ignore
/// let mut input = StreamEndpoint::open("in.wav")?;
/// let mut output = StreamEndpoint::create("out.aif", ContainerType::Aiff, target)?;
/// let report = ConversionEngine::new(&mut input, &mut output).convert()?;
/// output.close();
/// input.close();
/// ```
pub struct ConversionEngine<'a> {
    input: &'a mut StreamEndpoint,
    output: &'a mut StreamEndpoint,
    config: ConverterConfig,
    state: EngineState,
    failure: Option<ConversionError>,
    report: ConversionReport,
    converter: Option<SampleConverter>,
    working: Vec<u8>,
    cancel: Option<CancellationFlag>,
    on_progress: Option<ProgressCallback<'a>>,
    started: Option<Instant>,
}

impl<'a> ConversionEngine<'a> {
    /// Creates an engine with the default configuration.
    pub fn new(input: &'a mut StreamEndpoint, output: &'a mut StreamEndpoint) -> Self {
        Self::with_config(input, output, ConverterConfig::default())
    }

    pub fn with_config(
        input: &'a mut StreamEndpoint,
        output: &'a mut StreamEndpoint,
        config: ConverterConfig,
    ) -> Self {
        let report = ConversionReport::new(
            Uuid::new_v4().to_string(),
            input.format().clone(),
            output.format().clone(),
        );
        Self {
            input,
            output,
            config,
            state: EngineState::Idle,
            failure: None,
            report,
            converter: None,
            working: Vec::new(),
            cancel: None,
            on_progress: None,
            started: None,
        }
    }

    /// Sets the job ID carried by the report and progress updates.
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.report.job_id = job_id.into();
        self
    }

    /// Stops the conversion at the next batch boundary once `flag` is raised.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Calls `callback` every `progress_interval_batches` batches and on completion.
    pub fn on_progress(mut self, callback: impl FnMut(&ConversionProgress) + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Counters so far; complete once the engine reaches `Complete`.
    pub fn report(&self) -> &ConversionReport {
        &self.report
    }

    /// The error that moved the engine to `Failed`.
    pub fn failure(&self) -> Option<&ConversionError> {
        self.failure.as_ref()
    }

    /// Runs the conversion to completion.
    pub fn convert(&mut self) -> Result<ConversionReport, ConversionError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.state == EngineState::Complete {
            return Ok(self.report.clone());
        }

        match self.run() {
            Ok(()) => Ok(self.report.clone()),
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn run(&mut self) -> Result<(), ConversionError> {
        if self.state == EngineState::Idle {
            self.start()?;
        }
        while self.state == EngineState::Running {
            self.step()?;
        }
        if self.state == EngineState::Draining {
            self.drain()?;
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), ConversionError> {
        check_endpoint(self.input, EndpointRole::Input)?;
        check_endpoint(self.output, EndpointRole::Output)?;
        self.output.format().validate().map_err(EndpointError::from)?;

        let input_format = self.input.format().clone();
        let output_format = self.output.format().clone();
        let passthrough = input_format.is_directly_compatible(&output_format);

        let plan = if passthrough {
            BatchPlan::passthrough(&input_format, self.config.working_buffer_bytes)
        } else {
            self.converter = Some(SampleConverter::new(&input_format, &output_format)?);
            BatchPlan::converting(&input_format, &output_format, self.config.working_buffer_bytes)
        };
        if plan.capacity > self.config.working_buffer_bytes {
            debug!(
                requested = self.config.working_buffer_bytes,
                capacity = plan.capacity,
                "Working buffer grown to fit one packet"
            );
        }
        self.working = Vec::with_capacity(plan.capacity);

        self.report.input_format = input_format;
        self.report.output_format = output_format;
        self.report.passthrough = passthrough;
        self.report.packets_per_read = plan.packets_per_read;
        self.report.working_buffer_bytes = plan.capacity;
        self.report.started_at = Some(Utc::now());
        self.started = Some(Instant::now());

        info!(
            job_id = %self.report.job_id,
            input = %self.report.input_format,
            output = %self.report.output_format,
            passthrough,
            total_frames = self.input.total_frames(),
            "Starting conversion"
        );
        debug!(
            packets_per_read = plan.packets_per_read,
            capacity = plan.capacity,
            max_output_bytes = plan.max_output_bytes,
            "Planned batches"
        );
        self.state = EngineState::Running;
        Ok(())
    }

    fn step(&mut self) -> Result<(), ConversionError> {
        self.check_interrupts()?;
        let packets_per_read = self.report.packets_per_read;

        let batch = self.input.read_packets(packets_per_read)?;
        if batch.is_end_of_stream() {
            debug!(job_id = %self.report.job_id, "Input exhausted, draining");
            self.state = EngineState::Draining;
            return Ok(());
        }
        self.report.packets_read += u64::from(batch.packets);
        self.report.frames_read += u64::from(batch.frames);

        let (packets, frames, bytes) = match self.converter.as_mut() {
            None => {
                self.output
                    .write_packets(batch.data, batch.packets, batch.frames)?;
                (batch.packets, batch.frames, batch.data.len())
            }
            Some(converter) => {
                self.working.clear();
                let encoded =
                    converter.convert(batch.data, batch.packets, batch.frames, &mut self.working)?;
                if encoded.packets > 0 {
                    self.output
                        .write_packets(&self.working, encoded.packets, encoded.frames)?;
                }
                (encoded.packets, encoded.frames, self.working.len())
            }
        };

        self.record_write(packets, frames, bytes);
        self.report.batches += 1;
        trace!(
            batch = self.report.batches,
            packets_written = packets,
            bytes,
            "Converted batch"
        );

        let interval = self.config.progress_interval_batches;
        if interval > 0 && self.report.batches % interval == 0 {
            self.emit_progress();
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<(), ConversionError> {
        if let Some(converter) = self.converter.as_mut() {
            self.working.clear();
            let tail = converter.flush(&mut self.working)?;
            if tail.packets > 0 {
                self.output
                    .write_packets(&self.working, tail.packets, tail.frames)?;
            }
            self.report.flushed_packets = u64::from(tail.packets);
            let bytes = self.working.len();
            self.record_write(tail.packets, tail.frames, bytes);
            debug!(
                packets = tail.packets,
                frames = tail.frames,
                "Flushed buffered frames"
            );
        }

        self.finish_timing();
        self.state = EngineState::Complete;
        self.emit_progress();
        info!(
            job_id = %self.report.job_id,
            frames_read = self.report.frames_read,
            frames_written = self.report.frames_written,
            batches = self.report.batches,
            elapsed_ms = self.report.elapsed_ms,
            "Conversion complete"
        );
        Ok(())
    }

    fn check_interrupts(&self) -> Result<(), ConversionError> {
        if self.cancel.as_ref().is_some_and(|flag| flag.is_cancelled()) {
            return Err(ConversionError::Cancelled);
        }
        if let (Some(timeout), Some(started)) = (self.config.timeout(), self.started) {
            if started.elapsed() >= timeout {
                return Err(ConversionError::Timeout {
                    timeout_secs: timeout.as_secs(),
                });
            }
        }
        Ok(())
    }

    fn record_write(&mut self, packets: u32, frames: u32, bytes: usize) {
        self.report.packets_written += u64::from(packets);
        self.report.frames_written += u64::from(frames);
        self.report.peak_batch_bytes = self.report.peak_batch_bytes.max(bytes);
    }

    fn emit_progress(&mut self) {
        let progress = ConversionProgress::new(
            &self.report.job_id,
            self.report.frames_read,
            self.report.frames_written,
            self.input.total_frames(),
        );
        debug!(
            job_id = %progress.job_id,
            percent = progress.percent,
            frames_written = progress.frames_written,
            "Conversion progress"
        );
        if let Some(callback) = self.on_progress.as_mut() {
            callback(&progress);
        }
    }

    fn finish_timing(&mut self) {
        self.report.finished_at = Some(Utc::now());
        if let Some(started) = self.started {
            self.report.elapsed_ms = started.elapsed().as_millis() as u64;
        }
    }

    fn fail(&mut self, err: ConversionError) {
        warn!(
            job_id = %self.report.job_id,
            state = %self.state,
            error = %err,
            frames_written = self.report.frames_written,
            "Conversion failed"
        );
        self.finish_timing();
        self.state = EngineState::Failed;
        self.failure = Some(err);
    }
}

fn check_endpoint(endpoint: &StreamEndpoint, role: EndpointRole) -> Result<(), ConversionError> {
    if !endpoint.is_open() {
        return Err(ConversionError::EndpointNotOpen { role });
    }
    if endpoint.role() != role {
        return Err(EndpointError::WrongRole {
            operation: if role == EndpointRole::Input {
                "read packets"
            } else {
                "write packets"
            },
            role: endpoint.role().as_str(),
        }
        .into());
    }
    Ok(())
}
