//! # Subscription Handles
//!
//! Returned by [`EventBus::on`](crate::EventBus::on). Unlike a broadcast
//! receiver, dropping the handle keeps the handler registered; removal is
//! always explicit through [`Subscription::unsubscribe`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::bus::Registry;

/// Handle to one registration on the bus.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    topic: String,
    active: Arc<AtomicBool>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        topic: String,
        active: Arc<AtomicBool>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            id,
            topic,
            active,
            registry,
        }
    }

    /// Remove the handler from the bus.
    ///
    /// Idempotent: only the first call removes anything, and it only ever
    /// removes this registration.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        debug!(topic = %self.topic, id = self.id, "Subscription removed");
    }

    /// Whether the handler is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}
