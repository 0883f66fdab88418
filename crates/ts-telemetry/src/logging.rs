//! Structured logging.
//!
//! JSON lines carry `timestamp`, `level`, `target`, the event fields
//! (`urn`, `kind`, `item_hash`, `attempt`, ...) and the current span list.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Build the filter for `config`, falling back to `info` on a bad directive.
pub fn env_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber described by `config`.
///
/// Fails with `AlreadyInitialized` when another subscriber is installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if !config.console_output {
        return Ok(());
    }

    let builder = fmt().with_env_filter(env_filter(config)).with_target(true);
    let result = if config.json_logs {
        builder
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .try_init()
    } else {
        builder.compact().try_init()
    };
    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        filter = %config.log_level,
        "Logging initialized"
    );
    Ok(())
}

/// Route logs through the test harness writer. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
