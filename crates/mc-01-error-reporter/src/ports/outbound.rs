//! # Outbound Ports (Driven Ports)

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ErrorReport;

/// Remote delivery failures. Logged by the reporter, never retried.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sink rejected report with status {0}")]
    Rejected(u16),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for accepted reports.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    /// Deliver one report. Called at most once per report.
    async fn send(&self, report: &ErrorReport) -> Result<(), SinkError>;
}
