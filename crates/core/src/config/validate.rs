use super::{
    types::{Config, TargetCodec},
    ConfigError,
};
use crate::engine::MIN_WORKING_BUFFER_BYTES;

/// Validate configuration
/// Currently validates:
/// - Input and output paths are set and differ
/// - Working buffer is at least 1 KiB
/// - Timeout, if set, is not 0
/// - Requested channels and sample rate are positive
/// - IMA ADPCM output declares its block length
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let job = &config.job;
    if job.input.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "job.input cannot be empty".to_string(),
        ));
    }
    if job.output.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "job.output cannot be empty".to_string(),
        ));
    }
    if job.input == job.output {
        return Err(ConfigError::ValidationError(
            "job.input and job.output must be different files".to_string(),
        ));
    }

    // Format validation
    let format = &job.format;
    if format.channels == Some(0) {
        return Err(ConfigError::ValidationError(
            "job.format.channels cannot be 0".to_string(),
        ));
    }
    if let Some(rate) = format.sample_rate {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "job.format.sample_rate must be positive, got {}",
                rate
            )));
        }
    }
    if format.codec == TargetCodec::ImaAdpcm && format.frames_per_packet.is_none() {
        return Err(ConfigError::ValidationError(
            "job.format.frames_per_packet is required for ima_adpcm".to_string(),
        ));
    }

    // Converter validation
    if config.converter.working_buffer_bytes < MIN_WORKING_BUFFER_BYTES {
        return Err(ConfigError::ValidationError(format!(
            "converter.working_buffer_bytes must be at least {}",
            MIN_WORKING_BUFFER_BYTES
        )));
    }
    if config.converter.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobConfig, TargetFormat};
    use crate::engine::ConverterConfig;
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config {
            job: JobConfig {
                input: PathBuf::from("in.wav"),
                output: PathBuf::from("out.wav"),
                container: None,
                format: TargetFormat::default(),
            },
            converter: ConverterConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_same_input_and_output_fails() {
        let mut config = valid_config();
        config.job.output = config.job.input.clone();
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_empty_path_fails() {
        let mut config = valid_config();
        config.job.input = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_small_buffer_fails() {
        let mut config = valid_config();
        config.converter.working_buffer_bytes = 512;
        assert!(validate_config(&config).is_err());

        config.converter.working_buffer_bytes = 1024;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = valid_config();
        config.converter.timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_format_fields() {
        let mut config = valid_config();
        config.job.format.channels = Some(0);
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.job.format.sample_rate = Some(-1.0);
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.job.format.codec = TargetCodec::ImaAdpcm;
        assert!(validate_config(&config).is_err());
        config.job.format.frames_per_packet = Some(505);
        assert!(validate_config(&config).is_ok());
    }
}
