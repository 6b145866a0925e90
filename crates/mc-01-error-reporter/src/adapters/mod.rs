//! # Adapters
//!
//! - [`HttpErrorSink`]: production sink over `reqwest`
//! - [`InMemoryErrorSink`]: keeps deliveries in memory

pub mod http_sink;
pub mod memory_sink;

pub use http_sink::HttpErrorSink;
pub use memory_sink::InMemoryErrorSink;
