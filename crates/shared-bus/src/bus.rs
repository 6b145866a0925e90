//! # Event Bus
//!
//! Synchronous publish/subscribe with exact, namespace (`ns:*`) and global
//! (`*`) topics.
//!
//! ## Dispatch guarantees
//!
//! - Every matching registration runs at most once per emit, in
//!   registration order.
//! - The registration list is snapshotted before dispatch: handlers may call
//!   `on`, `unsubscribe` or `emit` from inside a handler. Registrations added
//!   during dispatch do not see the current event; registrations removed
//!   during dispatch are skipped if they have not run yet.
//! - A panicking handler is contained and logged; the remaining handlers
//!   still run and the emitter never observes the panic.

use mosaic_telemetry::{EVENT_BUS_HANDLER_PANICS, EVENT_BUS_MESSAGES_SENT};
use parking_lot::RwLock;
use serde_json::Value;
use shared_types::{SystemTimeSource, TimeSource};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use crate::events::{Event, TopicPattern};
use crate::subscription::Subscription;
use crate::DEFAULT_SOURCE;

/// Handler invoked for each matching event.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Registration {
    id: u64,
    pattern: TopicPattern,
    handler: EventHandler,
    once: bool,
    active: Arc<AtomicBool>,
}

/// Registration list shared with subscription handles.
#[derive(Default)]
pub(crate) struct Registry {
    entries: RwLock<Vec<Registration>>,
}

impl Registry {
    pub(crate) fn remove(&self, id: u64) {
        self.entries.write().retain(|entry| entry.id != id);
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

/// Process-wide event bus. Share it as `Arc<EventBus>`.
pub struct EventBus {
    /// Default emitter identity.
    source: String,
    registry: Arc<Registry>,
    next_id: AtomicU64,
    events_published: AtomicU64,
    clock: Arc<dyn TimeSource>,
}

impl EventBus {
    /// Create a bus whose emissions are stamped with `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_clock(source, Arc::new(SystemTimeSource))
    }

    pub fn with_clock(source: impl Into<String>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            source: source.into(),
            registry: Arc::new(Registry::default()),
            next_id: AtomicU64::new(1),
            events_published: AtomicU64::new(0),
            clock,
        }
    }

    /// Register `handler` for `topic` (exact, `ns:*` or `*`).
    #[must_use = "dropping the subscription keeps the handler registered with no way to remove it"]
    pub fn on<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(topic, Arc::new(handler), false)
    }

    /// Register `handler` for the next matching emission only.
    pub fn once<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(topic, Arc::new(handler), true)
    }

    fn register(&self, topic: &str, handler: EventHandler, once: bool) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));

        self.registry.entries.write().push(Registration {
            id,
            pattern: TopicPattern::parse(topic),
            handler,
            once,
            active: Arc::clone(&active),
        });

        debug!(topic, id, once, "New subscription created");

        Subscription::new(id, topic.to_string(), active, Arc::downgrade(&self.registry))
    }

    /// Emit with the bus's own source identity.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, topic: &str, payload: Value) -> usize {
        let event = Event::new(topic, payload, self.source.as_str(), self.clock.now());
        self.dispatch(&event)
    }

    /// Emit on behalf of another emitter (e.g. a remote module).
    pub fn emit_from(&self, source: &str, topic: &str, payload: Value) -> usize {
        let event = Event::new(topic, payload, source, self.clock.now());
        self.dispatch(&event)
    }

    /// Deliver a prebuilt event.
    pub fn dispatch(&self, event: &Event) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        EVENT_BUS_MESSAGES_SENT
            .with_label_values(&[event.source.as_str()])
            .inc();

        // Snapshot: the lock is never held while user code runs.
        let snapshot: Vec<(u64, EventHandler, bool, Arc<AtomicBool>)> = self
            .registry
            .entries
            .read()
            .iter()
            .filter(|entry| entry.pattern.matches(&event.event_type))
            .map(|entry| {
                (
                    entry.id,
                    Arc::clone(&entry.handler),
                    entry.once,
                    Arc::clone(&entry.active),
                )
            })
            .collect();

        let mut invoked = 0;
        for (id, handler, once, active) in snapshot {
            if once {
                // Claim the single delivery before running user code.
                if !active.swap(false, Ordering::SeqCst) {
                    continue;
                }
                self.registry.remove(id);
            } else if !active.load(Ordering::SeqCst) {
                continue;
            }

            invoked += 1;
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                EVENT_BUS_HANDLER_PANICS.inc();
                error!(
                    topic = %event.event_type,
                    source = %event.source,
                    subscription = id,
                    "Event handler panicked; continuing dispatch"
                );
            }
        }

        debug!(topic = %event.event_type, handlers = invoked, "Event dispatched");
        invoked
    }

    /// Number of live registrations.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.entries.read().len()
    }

    /// Total emissions since creation.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::{MODULE_LOADED, WILDCARD};
    use parking_lot::Mutex;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&Event) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let make = move |label: &str| -> Box<dyn Fn(&Event) + Send + Sync> {
            let log = Arc::clone(&log_clone);
            let label = label.to_string();
            Box::new(move |event: &Event| log.lock().push(format!("{label}:{}", event.event_type)))
        };
        (log, make)
    }

    #[test]
    fn test_emit_no_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.emit("cart:updated", json!({})), 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn test_registration_order() {
        let bus = EventBus::default();
        let (log, make) = recorder();

        let _a = bus.on("cart:updated", make("a"));
        let _b = bus.on(WILDCARD, make("b"));
        let _c = bus.on("cart:updated", make("c"));

        assert_eq!(bus.emit("cart:updated", json!(null)), 3);
        assert_eq!(
            *log.lock(),
            vec!["a:cart:updated", "b:cart:updated", "c:cart:updated"]
        );
    }

    #[test]
    fn test_wildcard_delivered_once_per_emit() {
        let bus = EventBus::default();
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let _sub = bus.on(WILDCARD, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(MODULE_LOADED, json!({"name": "widget"}));
        bus.emit("other:topic", json!(null));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_distinct_registrations_each_delivered() {
        let bus = EventBus::default();
        let count = Arc::new(AtomicU64::new(0));
        let (c1, c2) = (Arc::clone(&count), Arc::clone(&count));
        let _exact = bus.on("a:b", move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let _all = bus.on(WILDCARD, move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.emit("a:b", json!(null)), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_namespace_wildcard() {
        let bus = EventBus::default();
        let (log, make) = recorder();
        let _sub = bus.on("module:*", make("ns"));

        bus.emit("module:loaded", json!(null));
        bus.emit("market:tick", json!(null));
        assert_eq!(*log.lock(), vec!["ns:module:loaded"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = EventBus::default();
        let (log, make) = recorder();
        let first = bus.on("t:x", make("first"));
        let _second = bus.on("t:x", make("second"));

        first.unsubscribe();
        first.unsubscribe();
        assert!(!first.is_active());
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit("t:x", json!(null));
        assert_eq!(*log.lock(), vec!["second:t:x"]);
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let bus = EventBus::default();
        let sub = bus.on("t:x", |_| {});
        drop(bus);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let bus = EventBus::default();
        let (log, make) = recorder();
        let _before = bus.on("t:x", make("before"));
        let _boom = bus.on("t:x", |_| panic!("handler exploded"));
        let _after = bus.on("t:x", make("after"));

        let invoked = bus.emit("t:x", json!(null));
        assert_eq!(invoked, 3);
        assert_eq!(*log.lock(), vec!["before:t:x", "after:t:x"]);
    }

    #[test]
    fn test_no_replay_for_late_subscriber() {
        let bus = EventBus::default();
        bus.emit("t:x", json!(1));

        let (log, make) = recorder();
        let _late = bus.on("t:x", make("late"));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_subscribe_during_dispatch_misses_current_event() {
        let bus = Arc::new(EventBus::default());
        let (log, make) = recorder();
        let late_handler: Arc<Mutex<Option<Box<dyn Fn(&Event) + Send + Sync>>>> =
            Arc::new(Mutex::new(Some(make("late"))));
        let held: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));

        let bus_clone = Arc::clone(&bus);
        let held_clone = Arc::clone(&held);
        let _registrar = bus.on("t:x", move |_| {
            if let Some(handler) = late_handler.lock().take() {
                held_clone.lock().push(bus_clone.on("t:x", handler));
            }
        });

        bus.emit("t:x", json!(null));
        assert!(log.lock().is_empty());

        bus.emit("t:x", json!(null));
        assert_eq!(*log.lock(), vec!["late:t:x"]);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_skips_pending_handler() {
        let bus = EventBus::default();
        let (log, make) = recorder();
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let victim_clone = Arc::clone(&victim);
        let _killer = bus.on("t:x", move |_| {
            if let Some(sub) = victim_clone.lock().as_ref() {
                sub.unsubscribe();
            }
        });
        *victim.lock() = Some(bus.on("t:x", make("victim")));

        assert_eq!(bus.emit("t:x", json!(null)), 1);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_once_runs_a_single_time() {
        let bus = EventBus::default();
        let (log, make) = recorder();
        let sub = bus.once("t:x", make("once"));

        bus.emit("t:x", json!(null));
        bus.emit("t:x", json!(null));
        assert_eq!(*log.lock(), vec!["once:t:x"]);
        assert!(!sub.is_active());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_from_sets_source() {
        let bus = EventBus::new("container");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = bus.on(WILDCARD, move |e| s.lock().push(e.source.clone()));

        bus.emit("a:b", json!(null));
        bus.emit_from("cart", "a:b", json!(null));
        assert_eq!(*seen.lock(), vec!["container", "cart"]);
    }
}
