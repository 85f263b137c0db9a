use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{NamedTempFile, TempDir};

use audioconv_core::testing::fixtures;
use audioconv_core::StreamEndpoint;

/// Run the binary against a config file
fn run_cli(config_path: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_audioconv"))
        .env("AUDIOCONV_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .output()
        .expect("Failed to run audioconv")
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

fn job_config(input: &Path, output: &Path, format: &str) -> String {
    format!(
        r#"
[job]
input = "{}"
output = "{}"

[job.format]
{}
"#,
        input.display(),
        output.display(),
        format
    )
}

#[test]
fn test_converts_and_prints_report() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.aif");
    fixtures::write_wav(
        &input,
        &fixtures::cd_format(),
        &fixtures::sine_pcm16(4410, 2, 44_100.0, 440.0),
    )
    .unwrap();

    let config = write_config(&job_config(&input, &output, "sample_rate = 22050.0\nchannels = 1"));
    let result = run_cli(config.path());
    assert!(
        result.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(report["frames_read"], 4410);
    assert_eq!(report["frames_written"], 2205);
    assert_eq!(report["passthrough"], false);

    let converted = StreamEndpoint::open(&output).unwrap();
    assert_eq!(converted.total_frames(), 2205);
    assert_eq!(converted.format().channels, 1);
    assert_eq!(converted.format().sample_rate, 22_050.0);
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let result = run_cli(&dir.path().join("nope.toml"));
    assert!(!result.status.success());
    assert!(result.stdout.is_empty());
}

#[test]
fn test_missing_input_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("missing.wav");
    let output = dir.path().join("out.wav");

    let config = write_config(&job_config(&input, &output, ""));
    let result = run_cli(config.path());

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    fixtures::write_wav(&input, &fixtures::telephone_format(), &fixtures::ramp_pcm16(8, 1)).unwrap();
    let output = dir.path().join("out.wav");

    let config = write_config(&job_config(&input, &output, "channels = 0"));
    let result = run_cli(config.path());

    assert!(!result.status.success());
    assert!(!output.exists());
}
