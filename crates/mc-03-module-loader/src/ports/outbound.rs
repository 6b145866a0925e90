//! # Outbound Ports (Driven Ports)
//!
//! SPIs the loader depends on.

use async_trait::async_trait;
use shared_types::ModuleDescriptor;
use std::time::Duration;

use crate::domain::{FetchError, LoadedUnit};

/// Resolves a load address to module code.
///
/// A fetch in flight is never cancelled; the loader ignores its result if
/// the session moved on in the meantime.
#[async_trait]
pub trait ModuleFetcher: Send + Sync {
    async fn fetch(&self, descriptor: &ModuleDescriptor) -> Result<LoadedUnit, FetchError>;
}

/// Timer capability for retry backoff and the mount-wait timeout.
///
/// Injected so tests can fast-forward instead of waiting.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, delay: Duration);
}
