//! # Error Reporter Service
//!
//! Accepts failure reports, applies the throttle and capacity rules, stores
//! accepted reports and fans them out to the configured side effects.
//!
//! ## Report pipeline
//!
//! ```text
//! report() ──→ throttle? ──yes──→ None
//!                 │ no
//!                 ↓
//!              full? ──yes──→ warn once, None
//!                 │ no
//!                 ↓
//!        build + store ──→ log / bus / sink / hook / notification
//! ```
//!
//! Side effects run after the state lock is released, so a bus subscriber
//! or hook may call back into the reporter.

use mosaic_telemetry::{ERROR_REPORTS, ERROR_REPORTS_DROPPED};
use parking_lot::Mutex;
use shared_bus::{topics, EventBus};
use shared_types::{AuthService, ModuleFailure, NotificationService, SystemTimeSource, TimeSource};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::adapters::HttpErrorSink;
use crate::domain::{
    ErrorCategory, ErrorContext, ErrorReport, ErrorSummary, ReportThrottle, ReportedError,
    ReporterConfig, Severity,
};
use crate::ports::ErrorSink;

/// Custom callback invoked for every accepted report.
pub type ReportHook = Arc<dyn Fn(&ErrorReport) + Send + Sync>;

struct ReporterState {
    reports: Vec<ErrorReport>,
    /// `"<module>-<message>"` -> accepted reports.
    counts: HashMap<String, u64>,
    throttle: ReportThrottle,
    capacity_warned: bool,
}

pub struct ErrorReporter {
    config: ReporterConfig,
    session_id: String,
    state: Mutex<ReporterState>,
    clock: Arc<dyn TimeSource>,
    bus: Option<Arc<EventBus>>,
    sink: Option<Arc<dyn ErrorSink>>,
    auth: Option<Arc<dyn AuthService>>,
    notifications: Option<Arc<dyn NotificationService>>,
    on_report: Option<ReportHook>,
}

/// Builder for [`ErrorReporter`].
pub struct ErrorReporterBuilder {
    config: ReporterConfig,
    clock: Option<Arc<dyn TimeSource>>,
    bus: Option<Arc<EventBus>>,
    sink: Option<Arc<dyn ErrorSink>>,
    auth: Option<Arc<dyn AuthService>>,
    notifications: Option<Arc<dyn NotificationService>>,
    on_report: Option<ReportHook>,
}

impl ErrorReporterBuilder {
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Use this sink instead of the one derived from the config endpoint.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn auth(mut self, auth: Arc<dyn AuthService>) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn notifications(mut self, notifications: Arc<dyn NotificationService>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    #[must_use]
    pub fn on_report<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ErrorReport) + Send + Sync + 'static,
    {
        self.on_report = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> ErrorReporter {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemTimeSource));

        let sink = self.sink.or_else(|| {
            let endpoint = self.config.remote_target()?;
            match HttpErrorSink::new(endpoint) {
                Ok(sink) => Some(Arc::new(sink) as Arc<dyn ErrorSink>),
                Err(e) => {
                    warn!(endpoint, error = %e, "Remote error sink unavailable; reports stay local");
                    None
                }
            }
        });

        let session_id = format!("session-{}-{}", clock.now(), Uuid::new_v4().simple());
        let throttle = ReportThrottle::new(self.config.error_throttle_ms);

        ErrorReporter {
            config: self.config,
            session_id,
            state: Mutex::new(ReporterState {
                reports: Vec::new(),
                counts: HashMap::new(),
                throttle,
                capacity_warned: false,
            }),
            clock,
            bus: self.bus,
            sink,
            auth: self.auth,
            notifications: self.notifications,
            on_report: self.on_report,
        }
    }
}

impl ErrorReporter {
    /// Reporter with no collaborators wired.
    pub fn new(config: ReporterConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: ReporterConfig) -> ErrorReporterBuilder {
        ErrorReporterBuilder {
            config,
            clock: None,
            bus: None,
            sink: None,
            auth: None,
            notifications: None,
            on_report: None,
        }
    }

    /// Record a failure.
    ///
    /// Returns the stored report, or `None` when the `(module, message)` key
    /// is inside its throttle window or storage is full.
    pub fn report(
        &self,
        source_module: &str,
        failure: &ModuleFailure,
        category: ErrorCategory,
        context: ErrorContext,
    ) -> Option<ErrorReport> {
        let now = self.clock.now();

        let report = {
            let mut state = self.state.lock();

            if state
                .throttle
                .is_throttled(source_module, &failure.message, now)
            {
                ERROR_REPORTS_DROPPED.with_label_values(&["throttled"]).inc();
                debug!(module = source_module, message = %failure.message, "Error report throttled");
                return None;
            }

            if state.reports.len() >= self.config.max_errors_per_session {
                ERROR_REPORTS_DROPPED.with_label_values(&["capacity"]).inc();
                if !state.capacity_warned {
                    state.capacity_warned = true;
                    warn!(
                        capacity = self.config.max_errors_per_session,
                        "Max error reports reached for session; further reports are dropped"
                    );
                }
                return None;
            }

            let report = self.build_report(source_module, failure, category, context, now);

            state.throttle.record(source_module, &failure.message, now);
            *state
                .counts
                .entry(format!("{}-{}", source_module, failure.message))
                .or_default() += 1;
            state.reports.push(report.clone());
            report
        };

        self.publish(&report);
        Some(report)
    }

    #[cfg(test)]
    pub(crate) fn capacity_warned(&self) -> bool {
        self.state.lock().capacity_warned
    }

    fn build_report(
        &self,
        source_module: &str,
        failure: &ModuleFailure,
        category: ErrorCategory,
        mut context: ErrorContext,
        now: u64,
    ) -> ErrorReport {
        if context.session_id.is_none() {
            context.session_id = Some(self.session_id.clone());
        }
        if context.actor_id.is_none() {
            context.actor_id = self
                .auth
                .as_ref()
                .and_then(|auth| auth.session())
                .map(|session| session.user_id);
        }

        ErrorReport {
            id: format!("{}-{}", now, Uuid::new_v4().simple()),
            timestamp: now,
            source_module: source_module.to_string(),
            error: ReportedError::from(failure),
            context,
            severity: Severity::classify(category, failure.kind),
            category,
        }
    }

    fn publish(&self, report: &ErrorReport) {
        ERROR_REPORTS
            .with_label_values(&[report.category.as_str(), report.severity.as_str()])
            .inc();

        if self.config.enable_console_log {
            error!(
                module = %report.source_module,
                report_id = %report.id,
                category = %report.category,
                severity = %report.severity,
                kind = report.error.name.as_str(),
                retry_count = ?report.context.retry_count,
                "Remote module error: {}",
                report.error.message
            );
        }

        if self.config.forward_to_bus {
            if let Some(bus) = &self.bus {
                match serde_json::to_value(report) {
                    Ok(payload) => {
                        bus.emit(topics::ERROR_REPORTED, payload);
                    }
                    Err(e) => warn!(report_id = %report.id, error = %e, "Failed to encode error report"),
                }
            }
        }

        if self.config.enable_remote_logging {
            if let Some(sink) = &self.sink {
                self.deliver(Arc::clone(sink), report.clone());
            }
        }

        if let Some(hook) = &self.on_report {
            hook(report);
        }

        if report.severity == Severity::Critical {
            if let Some(notifications) = &self.notifications {
                notifications.error(
                    "Critical Error",
                    &format!(
                        "{} encountered a critical error. Please refresh the page.",
                        report.source_module
                    ),
                );
            }
        }
    }

    /// Fire-and-forget delivery on the ambient runtime.
    fn deliver(&self, sink: Arc<dyn ErrorSink>, report: ErrorReport) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sink.send(&report).await {
                        warn!(report_id = %report.id, error = %e, "Failed to send error report to remote");
                    }
                });
            }
            Err(_) => {
                warn!(report_id = %report.id, "No async runtime; remote delivery skipped");
            }
        }
    }

    /// All stored reports, oldest first.
    #[must_use]
    pub fn errors(&self) -> Vec<ErrorReport> {
        self.state.lock().reports.clone()
    }

    #[must_use]
    pub fn errors_for_module(&self, module: &str) -> Vec<ErrorReport> {
        self.state
            .lock()
            .reports
            .iter()
            .filter(|r| r.source_module == module)
            .cloned()
            .collect()
    }

    /// Accepted reports per `"<module>-<message>"` key.
    #[must_use]
    pub fn error_counts(&self) -> BTreeMap<String, u64> {
        self.state
            .lock()
            .counts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> ErrorSummary {
        ErrorSummary::from_reports(&self.state.lock().reports)
    }

    /// Purge reports, counts and throttle state, and re-arm the capacity
    /// warning.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.reports.clear();
        state.counts.clear();
        state.throttle.clear();
        state.capacity_warned = false;
        debug!("Error reports cleared");
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }
}
