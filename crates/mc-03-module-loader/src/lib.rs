//! # Module Loader (mc-03)
//!
//! Orchestrates the lifecycle of remote modules: resolve the load address,
//! fetch the code, validate its contract, mount it into a host container,
//! and unmount it on replacement or teardown.
//!
//! ## Lifecycle Events
//!
//! ```text
//! load() ──→ module:loading
//!              │
//!              ├──→ module:error {name, attempt, error}   (each failed attempt)
//!              │        backoff: base_delay * 2^retry_count
//!              ↓
//!            module:loaded
//!              │
//! unload() ──→ module:unloaded
//! ```
//!
//! Events for one session are emitted in this order and never reordered
//! across retries.
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | At most one attempt in flight per container | re-entrant `load` returns `AlreadyInFlight` |
//! | `retry_count <= max_retries` | checked before scheduling a retry |
//! | A mounted handle is unmounted at most once | unmount consumes the handle |
//! | Stale completions are dropped | session id compared after every suspension |
//! | `on_error` runs once per exhausted run | only the give-up path calls it |
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): state machine, retry policy, errors, module contract
//! - **Ports Layer** (`ports/`): `ModuleFetcher`, `Scheduler`
//! - **Adapters Layer** (`adapters/`): in-process registry, tokio timers
//! - **Service** (`service/`): `ModuleLoader`

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use adapters::{StaticModuleRegistry, TokioScheduler};
pub use domain::{
    Export, FetchError, LoadedUnit, LoaderConfig, LoaderError, RemoteModule, SessionState,
    DEFAULT_EXPORT,
};
pub use ports::{ModuleFetcher, Scheduler};
pub use service::{ErrorCallback, LoadOutcome, ModuleLoader, ModuleLoaderBuilder, SessionId};
pub use services::{HostServices, ModuleLogger, ModuleServices};
