//! # Module Failures
//!
//! The error value that crosses the boundary between a remote module and the
//! host. Remote code reports failures by returning `Err(ModuleFailure)`;
//! panics are converted into the same shape by the isolation layer.

use serde::{Deserialize, Serialize};
use std::any::Any;
use thiserror::Error;

/// Class of an underlying failure.
///
/// Severity classification depends on it: `TypeMismatch` and
/// `MissingReference` runtime failures are critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// A value had the wrong shape or type.
    TypeMismatch,
    /// Something referenced did not exist.
    MissingReference,
    /// The module panicked.
    Panic,
    /// Transport-level failure while fetching code.
    Network,
    /// A bounded wait expired.
    Timeout,
    /// Loaded code does not honor the module contract.
    Contract,
    /// The module's mount entry point failed.
    Mount,
    /// Code could not be resolved or fetched.
    Load,
    /// Anything else.
    Other,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeMismatch => "TypeError",
            Self::MissingReference => "ReferenceError",
            Self::Panic => "Panic",
            Self::Network => "NetworkError",
            Self::Timeout => "TimeoutError",
            Self::Contract => "ContractError",
            Self::Mount => "MountError",
            Self::Load => "LoadError",
            Self::Other => "Error",
        }
    }
}

/// A failure raised by or about a remote module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ModuleFailure {
    pub message: String,
    pub kind: FailureKind,
    pub trace: Option<String>,
}

impl ModuleFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            trace: None,
        }
    }

    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TypeMismatch, message)
    }

    pub fn missing_reference(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MissingReference, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }

    /// Build a failure from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "module panicked with a non-string payload".to_string()
        };
        Self::new(FailureKind::Panic, message)
    }
}
