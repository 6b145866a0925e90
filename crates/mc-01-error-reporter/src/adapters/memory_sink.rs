//! In-memory sink. Keeps every delivered report; can be told to fail.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::ErrorReport;
use crate::ports::{ErrorSink, SinkError};

#[derive(Default)]
pub struct InMemoryErrorSink {
    delivered: Mutex<Vec<ErrorReport>>,
    failing: AtomicBool,
}

impl InMemoryErrorSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail with `SinkError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn delivered(&self) -> Vec<ErrorReport> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl ErrorSink for InMemoryErrorSink {
    async fn send(&self, report: &ErrorReport) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("sink offline".into()));
        }
        self.delivered.lock().push(report.clone());
        Ok(())
    }
}
