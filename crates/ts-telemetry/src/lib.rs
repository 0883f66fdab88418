//! # Telemetry
//!
//! Logging setup shared by every binary and test suite of the provisioner.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ts_telemetry::{init_logging, TelemetryConfig};
//!
//! init_logging(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `ts-provisioner` | Service name |
//! | `TS_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `TS_CONSOLE_OUTPUT` | `true` | Write logs at all |
//! | `TS_JSON_LOGS` | `false` (`true` in containers) | JSON lines |

mod config;
mod logging;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{env_filter, init_logging, init_test_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}
