//! Reporter configuration.

use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Storage capacity. Reports past this are dropped, never evicted.
    pub max_errors_per_session: usize,

    /// Minimum interval between accepted reports sharing a
    /// `(module, message)` key, in milliseconds.
    pub error_throttle_ms: u64,

    /// Log each accepted report at error level.
    pub enable_console_log: bool,

    /// Deliver accepted reports to the remote sink.
    pub enable_remote_logging: bool,

    /// Remote sink URL.
    pub remote_endpoint: Option<String>,

    /// Publish `error:reported` on the event bus.
    pub forward_to_bus: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            max_errors_per_session: 100,
            error_throttle_ms: 5_000,
            enable_console_log: true,
            enable_remote_logging: false,
            remote_endpoint: None,
            forward_to_bus: true,
        }
    }
}

impl ReporterConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MOSAIC_MAX_ERRORS_PER_SESSION`: Storage capacity (default: 100)
    /// - `MOSAIC_ERROR_THROTTLE_MS`: Throttle window (default: 5000)
    /// - `MOSAIC_REMOTE_LOGGING`: Enable the remote sink (default: false)
    /// - `MOSAIC_REMOTE_ENDPOINT`: Remote sink URL (default: unset)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_errors_per_session: env::var("MOSAIC_MAX_ERRORS_PER_SESSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_errors_per_session),

            error_throttle_ms: env::var("MOSAIC_ERROR_THROTTLE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.error_throttle_ms),

            enable_remote_logging: env::var("MOSAIC_REMOTE_LOGGING")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            remote_endpoint: env::var("MOSAIC_REMOTE_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            ..defaults
        }
    }

    /// Remote delivery is active only with both the flag and an endpoint.
    #[must_use]
    pub fn remote_target(&self) -> Option<&str> {
        if self.enable_remote_logging {
            self.remote_endpoint.as_deref()
        } else {
            None
        }
    }
}
