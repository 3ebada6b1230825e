//! # Misaka Telemetry
//!
//! Observability for Misaka Network clients.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` registry with an `EnvFilter` and either
//!   pretty console output or JSON lines for log shippers.
//! - **Metrics**: Prometheus counters for emit, delivery, acknowledgment and
//!   per-message failures, labelled by telepath.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use misaka_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MISAKA_SERVICE_NAME` | `misaka-network` | Service name attached to logs |
//! | `MISAKA_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `MISAKA_JSON_LOGS` | `false` | Emit JSON formatted logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_metrics, register_metrics, MetricsRecorder, NoOpMetrics, PrometheusMetrics,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );
    Ok(())
}
