use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audioconv_core::{
    load_config, run_job_with_progress, validate_config, CancellationFlag, ConversionError,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Config path from the first argument, then the environment
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("AUDIOCONV_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("convert.toml"));

    info!("audioconv {} loading configuration from {:?}", VERSION, config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!(
        input = %config.job.input.display(),
        output = %config.job.output.display(),
        "Configuration loaded successfully"
    );

    let cancel = CancellationFlag::new();
    let job = config.job.clone();
    let converter = config.converter.clone();
    let flag = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || {
        run_job_with_progress(&job, &converter, Some(flag), |progress| {
            info!(
                percent = progress.percent,
                frames_written = progress.frames_written,
                "Progress"
            );
        })
    });

    let finished = tokio::select! {
        joined = &mut task => Some(joined),
        _ = shutdown_signal() => None,
    };
    let joined = match finished {
        Some(joined) => joined,
        None => {
            warn!("Shutdown signal received, stopping at the next batch");
            cancel.cancel();
            task.await
        }
    };
    let result = joined.context("Conversion task panicked")?;

    match result {
        Ok(report) => {
            let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
            println!("{}", json);
            info!(
                frames_written = report.frames_written,
                elapsed_ms = report.elapsed_ms,
                "Done"
            );
            Ok(())
        }
        Err(ConversionError::Cancelled) => {
            warn!("Conversion cancelled; output holds the frames written so far");
            Err(ConversionError::Cancelled.into())
        }
        Err(e) => Err(e).with_context(|| {
            format!(
                "Failed to convert {} to {}",
                config.job.input.display(),
                config.job.output.display()
            )
        }),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
