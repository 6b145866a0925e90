//! # Error Reporter (mc-01)
//!
//! Classifies, throttles and stores failures raised by or about remote
//! modules, and fans accepted reports out to the log, the event bus, an
//! optional remote sink and the host's notification service.
//!
//! ## Rules
//!
//! | Rule | Behavior |
//! |------|----------|
//! | Throttle | A `(module, message)` key is suppressed for `error_throttle_ms` after its last accepted report |
//! | Capacity | Past `max_errors_per_session` new reports are dropped, never evicted; one warning is logged |
//! | Severity | network → medium, timeout → low, load → high, runtime → critical for type-mismatch or missing-reference failures, else medium |
//! | Critical | Raises an error notification when the host provides one |
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): entities, severity policy, throttle window
//! - **Ports Layer** (`ports/`): `ErrorSink` for remote delivery
//! - **Adapters Layer** (`adapters/`): HTTP sink over `reqwest`, in-memory sink
//! - **Service** (`service`): the `ErrorReporter` itself

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{HttpErrorSink, InMemoryErrorSink};
pub use domain::{
    ErrorCategory, ErrorContext, ErrorReport, ErrorSummary, ReportedError, ReporterConfig,
    Severity,
};
pub use ports::{ErrorSink, SinkError};
pub use service::{ErrorReporter, ErrorReporterBuilder, ReportHook};
