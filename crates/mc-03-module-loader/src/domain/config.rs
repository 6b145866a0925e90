//! Loader configuration.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Automatic retries after the first failed attempt.
    pub max_retries: u32,

    /// Backoff base; retry `k` waits `base_delay * 2^k`.
    pub base_delay: Duration,

    /// How long a loaded module waits for its container to attach.
    pub mount_timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            mount_timeout: Duration::from_millis(5_000),
        }
    }
}

impl LoaderConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MOSAIC_MAX_RETRIES`: Automatic retries (default: 3)
    /// - `MOSAIC_RETRY_BASE_DELAY_MS`: Backoff base (default: 1000)
    /// - `MOSAIC_MOUNT_TIMEOUT_MS`: Container wait (default: 5000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str| {
            env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
        };

        Self {
            max_retries: env::var("MOSAIC_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            base_delay: millis("MOSAIC_RETRY_BASE_DELAY_MS").unwrap_or(defaults.base_delay),
            mount_timeout: millis("MOSAIC_MOUNT_TIMEOUT_MS").unwrap_or(defaults.mount_timeout),
        }
    }

    /// Delay before retry number `retry_count` (0-indexed).
    #[must_use]
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}
