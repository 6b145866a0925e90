//! # Cross-Crate Scenarios
//!
//! Every scenario wires the real event bus, error reporter, isolation
//! boundary and module loader; only the fetcher and timers are doubles.

pub mod crash_isolation;
pub mod fixtures;
pub mod load_flows;
pub mod reporting;
