//! # Loader Errors
//!
//! | Error | Retryable | Report category |
//! |-------|-----------|-----------------|
//! | `Load` | yes | `network` for transport failures, else `load` |
//! | `Contract` | no | `load` |
//! | `Mount` | yes | `load` |
//! | `Timeout` | yes | `timeout` |
//!
//! Runtime failures after a successful mount belong to the isolation
//! boundary and surface here only as `Crashed` from `update`.

use mc_01_error_reporter::ErrorCategory;
use mc_02_isolation_boundary::BoundaryError;
use shared_types::{ContainerId, FailureKind, ModuleFailure};
use thiserror::Error;

/// Why module code could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure (connection refused, DNS, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// Nothing is published at the address.
    #[error("No module published at {0}")]
    NotFound(String),

    /// The origin answered but refused to serve the code.
    #[error("{0}")]
    Rejected(String),
}

impl FetchError {
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum LoaderError {
    #[error("Failed to load module '{module}' from {address}: {source}")]
    Load {
        module: String,
        address: String,
        source: FetchError,
    },

    #[error("Module '{module}' does not export a valid module with mount function: {reason}")]
    Contract { module: String, reason: String },

    #[error("Failed to mount module '{module}': {failure}")]
    Mount {
        module: String,
        failure: ModuleFailure,
    },

    #[error("Mount timeout - container '{container}' not available for module '{module}'")]
    Timeout {
        module: String,
        container: ContainerId,
    },

    #[error("No load session for container '{0}'")]
    UnknownContainer(ContainerId),

    #[error("Module in container '{0}' is not mounted")]
    NotMounted(ContainerId),

    #[error(transparent)]
    Crashed(#[from] BoundaryError),
}

impl LoaderError {
    /// Whether the loader retries this error on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Load { .. } | Self::Mount { .. } | Self::Timeout { .. }
        )
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Load { source, .. } if source.is_network() => ErrorCategory::Network,
            Self::Load { .. } | Self::Contract { .. } | Self::Mount { .. } => ErrorCategory::Load,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::UnknownContainer(_) | Self::NotMounted(_) | Self::Crashed(_) => {
                ErrorCategory::Runtime
            }
        }
    }

    /// The failure value filed with the error reporter.
    #[must_use]
    pub fn to_failure(&self) -> ModuleFailure {
        let kind = match self {
            Self::Load { source, .. } if source.is_network() => FailureKind::Network,
            Self::Load { .. } => FailureKind::Load,
            Self::Contract { .. } => FailureKind::Contract,
            Self::Mount { failure, .. } => {
                return ModuleFailure {
                    message: self.to_string(),
                    kind: FailureKind::Mount,
                    trace: failure.trace.clone(),
                }
            }
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Crashed(err) => return err.failure().clone(),
            Self::UnknownContainer(_) | Self::NotMounted(_) => FailureKind::Other,
        };
        ModuleFailure::new(kind, self.to_string())
    }
}
