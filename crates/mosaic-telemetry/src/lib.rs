//! # Mosaic Telemetry
//!
//! Observability for the Mosaic runtime.
//!
//! ## Components
//!
//! - **Logging**: `tracing` subscriber with env filtering, pretty or JSON output
//! - **Metrics**: Prometheus counters, gauges and histograms for the bus,
//!   the loader, the isolation boundary and the error reporter
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mosaic_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MOSAIC_SERVICE_NAME` | `mosaic-host` | Service name in log lines |
//! | `MOSAIC_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `MOSAIC_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `MOSAIC_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, BOUNDARY_CRASHES, ERROR_REPORTS,
    ERROR_REPORTS_DROPPED, EVENT_BUS_HANDLER_PANICS, EVENT_BUS_MESSAGES_SENT, MODULES_MOUNTED,
    MODULE_LOAD_ATTEMPTS, MODULE_LOAD_DURATION,
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

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { _metrics: metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for creating a span with module context.
///
/// # Example
///
/// ```rust,ignore
/// let _span = module_span!("mount", module = "cart", container = "sidebar");
/// ```
#[macro_export]
macro_rules! module_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
