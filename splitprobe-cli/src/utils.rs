//! Logging setup and configuration loading shared by the commands

use anyhow::{Context, Result};
use splitprobe_config::{ConfigLoader, LogFormat, LoggingConfig, ProbeConfig};
use std::path::Path;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Pick the filter: an explicit `--log-level` wins, then `RUST_LOG`, then
/// the configured level
pub fn env_filter(config: &LoggingConfig, log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', falling back to '{}'", level, config.level);
            EnvFilter::new(config.level.as_str())
        }),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_str())),
    }
}

/// Install the global subscriber. Logs go to stderr so reports on stdout
/// stay machine-readable. A second call is a no-op.
pub fn init_tracing(config: &LoggingConfig, log_level: Option<&str>) -> Result<()> {
    let filter = env_filter(config, log_level);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("Tracing already initialized: {}", e);
    }
    debug!("Tracing initialized ({:?} format)", config.format);
    Ok(())
}

/// Load configuration from file or from environment and defaults
pub fn load_config(config_path: Option<&Path>) -> Result<ProbeConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                info!("Loading configuration from: {:?}", path);
                loader
                    .from_file(path)
                    .with_context(|| format!("Failed to load configuration from {:?}", path))
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}
