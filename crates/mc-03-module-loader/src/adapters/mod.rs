//! # Adapters
//!
//! - [`StaticModuleRegistry`]: in-process address → module map
//! - [`TokioScheduler`]: tokio timers

pub mod static_registry;
pub mod tokio_scheduler;

pub use static_registry::StaticModuleRegistry;
pub use tokio_scheduler::TokioScheduler;
