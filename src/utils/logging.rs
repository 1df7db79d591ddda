//! Logging setup for the command line binary
//! Author: kartik4091

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::error::{Error, Result};

/// Levels accepted by [`init_logging`]
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Builds the filter for this crate's targets. Unknown levels fall back to
/// `info`.
pub fn log_filter(level: &str) -> EnvFilter {
    let level = level.trim().to_ascii_lowercase();
    let level = if LOG_LEVELS.contains(&level.as_str()) { level.as_str() } else { "info" };
    EnvFilter::new(format!("pdx_rewrite={}", level))
}

/// Installs the global compact `tracing` subscriber
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Config(format!("Failed to set tracing subscriber: {}", e)))
}
