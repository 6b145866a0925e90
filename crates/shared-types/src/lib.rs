//! # Shared Types Crate
//!
//! Value types shared by every layer of the Mosaic runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the descriptor, container and failure types
//!   used by the loader, the isolation boundary and the error reporter are
//!   defined here and nowhere else.
//! - **Narrow host contracts**: optional host services (auth, notification,
//!   modal) are traits; a remote module only ever sees `Option<Arc<dyn _>>`.
//! - **Injected time**: components that reason about time take a
//!   [`TimeSource`] so tests can drive the clock.

pub mod container;
pub mod descriptor;
pub mod failure;
pub mod services;
pub mod time;

pub use container::{Container, ContainerId};
pub use descriptor::ModuleDescriptor;
pub use failure::{FailureKind, ModuleFailure};
pub use services::{
    capabilities, AuthService, AuthSession, ModalRequest, ModalService, Notification,
    NotificationLevel, NotificationService,
};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource, Timestamp};
