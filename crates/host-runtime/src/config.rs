//! # Host Configuration
//!
//! Unified configuration for telemetry, error reporting and module loading.
//!
//! All values have defaults; `from_env` overrides them from `MOSAIC_*`
//! variables. `validate` rejects combinations that would silently disable a
//! feature the operator asked for.

use mc_01_error_reporter::ReporterConfig;
use mc_03_module_loader::LoaderConfig;
use mosaic_telemetry::TelemetryConfig;
use thiserror::Error;

/// Complete host configuration.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    /// Logging output.
    pub telemetry: TelemetryConfig,
    /// Error reporter limits and remote delivery.
    pub reporter: ReporterConfig,
    /// Retry, backoff and mount timeout.
    pub loader: LoaderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Remote error logging is enabled but MOSAIC_REMOTE_ENDPOINT is not set")]
    MissingRemoteEndpoint,

    #[error("Remote endpoint must be an http(s) URL, got '{0}'")]
    InvalidRemoteEndpoint(String),

    #[error("MOSAIC_MAX_ERRORS_PER_SESSION must be greater than zero")]
    ZeroErrorCapacity,
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self {
            telemetry: TelemetryConfig::from_env(),
            reporter: ReporterConfig::from_env(),
            loader: LoaderConfig::from_env(),
        }
    }

    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reporter.max_errors_per_session == 0 {
            return Err(ConfigError::ZeroErrorCapacity);
        }

        if self.reporter.enable_remote_logging {
            let endpoint = self
                .reporter
                .remote_endpoint
                .as_deref()
                .ok_or(ConfigError::MissingRemoteEndpoint)?;
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::InvalidRemoteEndpoint(endpoint.to_string()));
            }
        }

        Ok(())
    }
}
