//! Tracing subscriber setup. Everything goes to stderr: stdout carries the
//! IPC channel in worker mode and the job report otherwise.

use anyhow::{anyhow, Result};
use relay_config::{LogFormat, LoggingConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Resolve the filter: `--log-level`, then `RUST_LOG`, then the configured level
fn env_filter(log_level: Option<&str>, fallback: &str) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', falling back to '{}'", level, fallback);
            EnvFilter::new(fallback)
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
    }
}

/// Initialize logging from the loaded configuration
pub fn init_logging(config: &LoggingConfig, log_level: Option<&str>) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level, config.level.as_str()))
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    debug!(format = ?config.format, "Logging initialized");
    Ok(())
}

/// Initialize tracing for task processes, before configuration is read
pub fn init_worker_tracing(log_level: Option<&str>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level, "warn"))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize worker tracing: {}", e))?;

    debug!("Worker tracing initialized");
    Ok(())
}
