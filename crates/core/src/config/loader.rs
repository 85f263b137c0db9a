use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix for overrides, e.g. `AUDIOCONV_CONVERTER__TIMEOUT_SECS`.
pub const ENV_PREFIX: &str = "AUDIOCONV_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetCodec;
    use crate::container::ContainerType;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[job]
input = "in.wav"
output = "out.aif"
container = "aiff"

[job.format]
codec = "pcm"
sample_rate = 22050
channels = 1

[converter]
working_buffer_bytes = 8192
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.job.input, PathBuf::from("in.wav"));
        assert_eq!(config.job.container, Some(ContainerType::Aiff));
        assert_eq!(config.job.format.codec, TargetCodec::Pcm);
        assert_eq!(config.job.format.sample_rate, Some(22_050.0));
        assert_eq!(config.job.format.channels, Some(1));
        assert_eq!(config.converter.working_buffer_bytes, 8192);
        assert_eq!(config.converter.progress_interval_batches, 64);
    }

    #[test]
    fn test_load_config_from_str_missing_job() {
        let toml = r#"
[converter]
timeout_secs = 10
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_from_str_unknown_codec() {
        let toml = r#"
[job]
input = "in.wav"
output = "out.wav"

[job.format]
codec = "mp3"
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/convert.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[job]
input = "/music/take1.wav"
output = "/music/take1.aifc"

[job.format]
codec = "ulaw"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.job.output, PathBuf::from("/music/take1.aifc"));
        assert_eq!(config.job.format.codec, TargetCodec::Ulaw);
        assert_eq!(config.job.output_container(), Some(ContainerType::Aifc));
        assert_eq!(config.converter.timeout_secs, None);
    }
}
