//! # Domain Layer
//!
//! Session state machine, retry policy, error taxonomy and the remote module
//! contract.

pub mod config;
pub mod errors;
pub mod module;
pub mod state;

pub use config::LoaderConfig;
pub use errors::{FetchError, LoaderError};
pub use module::{Export, LoadedUnit, RemoteModule, DEFAULT_EXPORT};
pub use state::SessionState;
