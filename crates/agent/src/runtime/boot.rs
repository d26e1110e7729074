//! Boot: logging init and config load.

use std::path::Path;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::conf::{AgentConfig, ConfigError, LogFormat, LoggingConfig};

/// Phase 1: Basic tracing init so we can log during config loading.
/// Uses RUST_LOG env var or a sensible default.
pub fn init_tracing_basic() -> tracing::subscriber::DefaultGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,galaxy_agent=debug"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

/// Phase 2: Install the global subscriber from configuration.
/// RUST_LOG still wins over the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
}

/// Load and validate configuration.
pub fn load_config(path: Option<&Path>) -> Result<AgentConfig, ConfigError> {
    let config = AgentConfig::load(path)?;
    config.validate().map_err(ConfigError::Invalid)?;
    info!(
        "Loaded configuration: watch_dir={}, state_file={}, channel={}",
        config.watch_dir,
        config.state_path().display(),
        config.slack.channel
    );
    Ok(config)
}
