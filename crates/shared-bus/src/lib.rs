//! # Shared Bus - Event Bus for Host/Module Communication
//!
//! The only sanctioned channel between the host and mounted remote modules.
//!
//! ## Rules
//!
//! - Host and remote modules never hold references to each other; they
//!   publish and subscribe on the bus.
//! - Dispatch is synchronous, in the emitter's call stack, in subscription
//!   order.
//! - A failing handler never affects other handlers or the emitter.
//! - No buffering, no replay: late subscribers miss earlier emissions.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │    Host      │                    │ Remote module│
//! │              │    emit()          │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘    on()
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bus;
pub mod events;
pub mod subscription;
pub mod topics;

pub use bus::{EventBus, EventHandler};
pub use events::{Event, TopicPattern};
pub use subscription::Subscription;

/// Emitter identity used when the host does not name one.
pub const DEFAULT_SOURCE: &str = "host";
