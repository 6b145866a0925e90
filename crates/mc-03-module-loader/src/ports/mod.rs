//! # Ports

pub mod outbound;

pub use outbound::{ModuleFetcher, Scheduler};
