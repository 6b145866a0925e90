//! # Isolation Boundary
//!
//! Wraps every synchronous call into a mounted module (render, update). A
//! failure inside the call, returned or panicked, is intercepted, reported
//! once with category `runtime`, and turns the boundary into the crashed
//! state until [`IsolationBoundary::retry`] is invoked.
//!
//! ## Limitation
//!
//! Only the call stack the boundary owns is covered. A failure inside a task
//! or timer the module spawned itself happens outside any `run` call and is
//! not intercepted; the module must surface it through
//! [`IsolationBoundary::capture`] or the error reporter.

use async_trait::async_trait;
use mc_01_error_reporter::{ErrorCategory, ErrorContext, ErrorReporter};
use mosaic_telemetry::{log_module_event, BOUNDARY_CRASHES};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::ModuleFailure;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

use crate::error::BoundaryError;

/// Run `f`, converting both `Err` and a panic into a [`ModuleFailure`].
pub fn contain<T, F>(f: F) -> Result<T, ModuleFailure>
where
    F: FnOnce() -> Result<T, ModuleFailure>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(ModuleFailure::from_panic(payload)),
    }
}

/// Invoked by [`IsolationBoundary::retry`] after the crashed state is
/// cleared. The loader installs one that re-runs the owning session.
#[async_trait]
pub trait Recovery: Send + Sync {
    async fn recover(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BoundaryState {
    Healthy,
    Crashed(ModuleFailure),
}

/// What the host should display for the wrapped region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BoundaryView {
    Healthy,
    Crashed { message: String },
}

pub struct IsolationBoundary {
    module_name: String,
    reporter: Arc<ErrorReporter>,
    state: Mutex<BoundaryState>,
    recovery: Mutex<Option<Arc<dyn Recovery>>>,
    context: ErrorContext,
}

impl IsolationBoundary {
    pub fn new(module_name: impl Into<String>, reporter: Arc<ErrorReporter>) -> Self {
        Self {
            module_name: module_name.into(),
            reporter,
            state: Mutex::new(BoundaryState::Healthy),
            recovery: Mutex::new(None),
            context: ErrorContext::default(),
        }
    }

    /// Context attached to every report this boundary files.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    pub fn set_recovery(&self, recovery: Arc<dyn Recovery>) {
        *self.recovery.lock() = Some(recovery);
    }

    /// Execute a call into the module.
    ///
    /// While crashed the module is not invoked and the first failure is
    /// returned again.
    pub fn run<T, F>(&self, f: F) -> Result<T, BoundaryError>
    where
        F: FnOnce() -> Result<T, ModuleFailure>,
    {
        if let BoundaryState::Crashed(failure) = &*self.state.lock() {
            return Err(self.crashed(failure.clone()));
        }

        contain(f).map_err(|failure| {
            self.capture(failure.clone());
            self.crashed(failure)
        })
    }

    /// Record a failure the module surfaced on its own.
    ///
    /// Reports and crashes only from the healthy state; a failure while
    /// already crashed is dropped.
    pub fn capture(&self, failure: ModuleFailure) {
        {
            let mut state = self.state.lock();
            if matches!(*state, BoundaryState::Crashed(_)) {
                debug!(module = %self.module_name, "Failure while crashed ignored");
                return;
            }
            *state = BoundaryState::Crashed(failure.clone());
        }

        BOUNDARY_CRASHES.inc();
        log_module_event!(
            warn,
            self.module_name,
            "Isolation boundary caught a module failure",
            kind = failure.kind.as_str(),
            error = %failure.message
        );
        self.reporter.report(
            &self.module_name,
            &failure,
            ErrorCategory::Runtime,
            self.context.clone(),
        );
    }

    /// Clear the crashed state and run the recovery hook.
    pub async fn retry(&self) {
        self.reset();
        let recovery = self.recovery.lock().clone();
        if let Some(recovery) = recovery {
            recovery.recover().await;
        }
    }

    /// Clear the crashed state without recovering.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if matches!(*state, BoundaryState::Crashed(_)) {
            debug!(module = %self.module_name, "Isolation boundary reset");
        }
        *state = BoundaryState::Healthy;
    }

    #[must_use]
    pub fn is_crashed(&self) -> bool {
        matches!(*self.state.lock(), BoundaryState::Crashed(_))
    }

    #[must_use]
    pub fn failure(&self) -> Option<ModuleFailure> {
        match &*self.state.lock() {
            BoundaryState::Healthy => None,
            BoundaryState::Crashed(failure) => Some(failure.clone()),
        }
    }

    #[must_use]
    pub fn view(&self) -> BoundaryView {
        match &*self.state.lock() {
            BoundaryState::Healthy => BoundaryView::Healthy,
            BoundaryState::Crashed(failure) => BoundaryView::Crashed {
                message: failure.message.clone(),
            },
        }
    }

    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    fn crashed(&self, failure: ModuleFailure) -> BoundaryError {
        BoundaryError::Crashed {
            module: self.module_name.clone(),
            failure,
        }
    }
}

impl std::fmt::Debug for IsolationBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolationBoundary")
            .field("module_name", &self.module_name)
            .field("crashed", &self.is_crashed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_01_error_reporter::{ReporterConfig, Severity};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn boundary() -> (IsolationBoundary, Arc<ErrorReporter>) {
        let reporter = Arc::new(ErrorReporter::new(ReporterConfig::default()));
        (IsolationBoundary::new("cart", reporter.clone()), reporter)
    }

    #[derive(Default)]
    struct CountingRecovery {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Recovery for CountingRecovery {
        async fn recover(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_contain_passes_success_through() {
        assert_eq!(contain(|| Ok::<_, ModuleFailure>(7)), Ok(7));
    }

    #[test]
    fn test_contain_converts_panic() {
        let result: Result<(), _> = contain(|| panic!("render exploded"));
        let failure = result.unwrap_err();
        assert_eq!(failure.message, "render exploded");
        assert_eq!(failure.kind, shared_types::FailureKind::Panic);
    }

    #[test]
    fn test_failure_crashes_and_reports_once() {
        let (boundary, reporter) = boundary();

        let result: Result<(), _> = boundary.run(|| Err(ModuleFailure::type_mismatch("x is undefined")));
        assert!(matches!(result, Err(BoundaryError::Crashed { .. })));
        assert!(boundary.is_crashed());

        let reports = reporter.errors();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category, ErrorCategory::Runtime);
        assert_eq!(reports[0].severity, Severity::Critical);
        assert_eq!(reports[0].source_module, "cart");
    }

    #[test]
    fn test_crashed_short_circuits() {
        let (boundary, reporter) = boundary();
        let _ = boundary.run(|| -> Result<(), _> { panic!("first") });

        let invoked = AtomicUsize::new(0);
        let result = boundary.run(|| {
            invoked.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert_eq!(result.unwrap_err().failure().message, "first");
        assert_eq!(reporter.errors().len(), 1);
    }

    #[test]
    fn test_view() {
        let (boundary, _) = boundary();
        assert_eq!(boundary.view(), BoundaryView::Healthy);

        let _ = boundary.run(|| -> Result<(), _> { Err(ModuleFailure::other("bad props")) });
        assert_eq!(
            boundary.view(),
            BoundaryView::Crashed {
                message: "bad props".into()
            }
        );
        let json = serde_json::to_value(boundary.view()).unwrap();
        assert_eq!(json["state"], "crashed");
    }

    #[tokio::test]
    async fn test_retry_clears_and_recovers() {
        let (boundary, _) = boundary();
        let recovery = Arc::new(CountingRecovery::default());
        boundary.set_recovery(recovery.clone());

        let _ = boundary.run(|| -> Result<(), _> { panic!("boom") });
        boundary.retry().await;

        assert!(!boundary.is_crashed());
        assert_eq!(recovery.calls.load(Ordering::SeqCst), 1);
        assert_eq!(boundary.run(|| Ok(5)).unwrap(), 5);
    }

    #[test]
    fn test_capture_while_crashed_is_dropped() {
        let (boundary, reporter) = boundary();
        boundary.capture(ModuleFailure::other("timer failed"));
        boundary.capture(ModuleFailure::other("another timer failed"));

        assert_eq!(boundary.failure().unwrap().message, "timer failed");
        assert_eq!(reporter.errors().len(), 1);
    }
}
