//! # Error Report Entities
//!
//! Reports are immutable once built and serialize to camelCase JSON, the
//! shape the remote sink and bus subscribers receive.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{FailureKind, ModuleFailure, Timestamp};
use std::collections::BTreeMap;
use std::fmt;

/// Where in the lifecycle a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Code could not be resolved, validated or mounted.
    Load,
    /// Failure after a successful mount.
    Runtime,
    /// Transport failure while fetching code.
    Network,
    /// A bounded wait expired.
    Timeout,
}

impl ErrorCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Runtime => "runtime",
            Self::Network => "network",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Fixed policy: by category first, then by the failure kind for
    /// runtime failures.
    #[must_use]
    pub fn classify(category: ErrorCategory, kind: FailureKind) -> Self {
        match category {
            ErrorCategory::Network => Self::Medium,
            ErrorCategory::Timeout => Self::Low,
            ErrorCategory::Load => Self::High,
            ErrorCategory::Runtime => match kind {
                FailureKind::TypeMismatch | FailureKind::MissingReference => Self::Critical,
                _ => Self::Medium,
            },
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context attached to a report.
///
/// Callers fill what they know; the reporter adds the session and actor ids
/// when the caller left them empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Free-form key/values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl ErrorContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn load_address(mut self, address: impl Into<String>) -> Self {
        self.load_address = Some(address.into());
        self
    }

    #[must_use]
    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// The failure as it appears in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedError {
    pub message: String,
    /// Display name of the failure class, e.g. `TypeError`.
    pub name: String,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl From<&ModuleFailure> for ReportedError {
    fn from(failure: &ModuleFailure) -> Self {
        Self {
            message: failure.message.clone(),
            name: failure.kind.as_str().to_string(),
            kind: failure.kind,
            trace: failure.trace.clone(),
        }
    }
}

/// An accepted failure record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// `<millis>-<random>`.
    pub id: String,
    pub timestamp: Timestamp,
    pub source_module: String,
    pub error: ReportedError,
    pub context: ErrorContext,
    pub severity: Severity,
    pub category: ErrorCategory,
}

/// Aggregate counts over stored reports, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    pub total_errors: usize,
    pub errors_by_type: BTreeMap<ErrorCategory, usize>,
    pub errors_by_severity: BTreeMap<Severity, usize>,
    pub errors_by_module: BTreeMap<String, usize>,
}

impl ErrorSummary {
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a ErrorReport>) -> Self {
        let mut summary = Self::default();
        for report in reports {
            summary.total_errors += 1;
            *summary.errors_by_type.entry(report.category).or_default() += 1;
            *summary.errors_by_severity.entry(report.severity).or_default() += 1;
            *summary
                .errors_by_module
                .entry(report.source_module.clone())
                .or_default() += 1;
        }
        summary
    }

    /// Count for one category, zero when absent.
    #[must_use]
    pub fn by_type(&self, category: ErrorCategory) -> usize {
        self.errors_by_type.get(&category).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> usize {
        self.errors_by_severity.get(&severity).copied().unwrap_or(0)
    }
}
