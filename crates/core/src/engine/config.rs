//! Configuration for the conversion engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest working buffer accepted by config validation.
pub const MIN_WORKING_BUFFER_BYTES: usize = 1024;

/// Tuning knobs for a [`ConversionEngine`](super::ConversionEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Capacity of the buffer holding one converted batch, in bytes.
    #[serde(default = "default_working_buffer_bytes")]
    pub working_buffer_bytes: usize,

    /// Abort the conversion after this many seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Report progress every this many batches (0 disables progress reports).
    #[serde(default = "default_progress_interval")]
    pub progress_interval_batches: u64,
}

fn default_working_buffer_bytes() -> usize {
    32 * 1024
}

fn default_progress_interval() -> u64 {
    64
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            working_buffer_bytes: default_working_buffer_bytes(),
            timeout_secs: None,
            progress_interval_batches: default_progress_interval(),
        }
    }
}

impl ConverterConfig {
    /// Sets the working buffer capacity.
    pub fn with_working_buffer(mut self, bytes: usize) -> Self {
        self.working_buffer_bytes = bytes;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Sets the progress reporting interval.
    pub fn with_progress_interval(mut self, batches: u64) -> Self {
        self.progress_interval_batches = batches;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.working_buffer_bytes, 32768);
        assert_eq!(config.timeout_secs, None);
        assert_eq!(config.progress_interval_batches, 64);
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_builders() {
        let config = ConverterConfig::default()
            .with_working_buffer(4096)
            .with_timeout(30)
            .with_progress_interval(0);
        assert_eq!(config.working_buffer_bytes, 4096);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.progress_interval_batches, 0);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ConverterConfig = toml::from_str("timeout_secs = 5").unwrap();
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.working_buffer_bytes, 32768);
    }
}
