//! HTTP error sink: POSTs each report as JSON to a fixed endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::domain::ErrorReport;
use crate::ports::{ErrorSink, SinkError};

pub struct HttpErrorSink {
    client: Client,
    endpoint: String,
}

impl HttpErrorSink {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(SinkError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ErrorSink for HttpErrorSink {
    async fn send(&self, report: &ErrorReport) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(report)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SinkError::Unavailable(format!("Cannot connect to {}", self.endpoint))
                } else {
                    SinkError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected(status.as_u16()));
        }

        debug!(report_id = %report.id, endpoint = %self.endpoint, "Error report delivered");
        Ok(())
    }
}
