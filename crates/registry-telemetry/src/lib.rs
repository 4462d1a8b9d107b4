//! # Registry Telemetry
//!
//! Logging and metrics for the service registry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use registry_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!     // Registry logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `service-registry` | Service name in logs |
//! | `REGISTRY_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `REGISTRY_JSON_LOGS` | `false` | JSON output (defaults on inside containers) |
//! | `REGISTRY_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, ACTIVE_WATCHES, ADVERTISEMENTS_PUBLISHED,
    ADVERTISEMENT_FAILURES, LOCAL_NODES, QUERIES, QUERY_DURATION, QUERY_REPLIES, WATCH_EVENTS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Register metrics, then install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
