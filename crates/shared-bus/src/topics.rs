//! Well-known topics.

/// Matches every emission.
pub const WILDCARD: &str = "*";

/// A load session started (or was manually restarted).
pub const MODULE_LOADING: &str = "module:loading";
/// A module mounted successfully.
pub const MODULE_LOADED: &str = "module:loaded";
/// A mounted module was torn down.
pub const MODULE_UNLOADED: &str = "module:unloaded";
/// A load attempt failed.
pub const MODULE_ERROR: &str = "module:error";

/// An error report was accepted by the error reporter.
pub const ERROR_REPORTED: &str = "error:reported";
