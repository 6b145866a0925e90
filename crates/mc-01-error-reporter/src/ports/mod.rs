//! # Ports
//!
//! Outbound SPI for delivering accepted reports off-process.

pub mod outbound;

pub use outbound::{ErrorSink, SinkError};
