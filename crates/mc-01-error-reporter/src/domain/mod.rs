//! # Domain Layer
//!
//! Report entities, the severity policy, the throttle window and the
//! reporter configuration. No I/O.

pub mod config;
pub mod entities;
pub mod throttle;

pub use config::ReporterConfig;
pub use entities::{
    ErrorCategory, ErrorContext, ErrorReport, ErrorSummary, ReportedError, Severity,
};
pub use throttle::ReportThrottle;
