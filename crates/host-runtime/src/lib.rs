//! # Mosaic Host Runtime
//!
//! Builds the per-process [`HostContext`] that a host application uses to
//! mount remote modules.
//!
//! ## Modular Structure
//!
//! - `config` - `HostConfig` assembled from `MOSAIC_*` environment variables
//! - `context` - `HostContext` owning the bus, the error reporter and the loader
//!
//! ```text
//! HostConfig::from_env()
//!        │
//!        ↓
//! HostContext::build ──→ EventBus("container")
//!                    ├──→ ErrorReporter ──→ bus / notifications / remote sink
//!                    └──→ ModuleLoader  ──→ fetch → mount → unmount
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod context;

pub use config::{ConfigError, HostConfig};
pub use context::{ContextError, HostContext, HOST_SOURCE};
