//! # Load Session State Machine
//!
//! ```text
//!            load
//!   Idle ──────────→ Loading ──→ Mounting ──→ Mounted
//!    ↑                 │  ↑          │           │ unload
//!    │                 ↓  │          ↓           ↓
//!    │              RetryWait ←──────┘       Unmounting
//!    │                 │                         │
//!    │                 ↓ retries exhausted       │
//!    │               Failed                      │
//!    └───────────────────────────────────────────┘
//! ```
//!
//! `Loading` and `Mounting` can also go straight to `Failed` on a
//! non-retryable error.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    Idle,
    /// Fetching and validating code.
    Loading,
    /// Waiting for the container and invoking mount.
    Mounting,
    /// Backing off before the next attempt.
    RetryWait,
    Mounted,
    Unmounting,
    /// Retries exhausted or a non-retryable error; needs a manual retry.
    Failed,
}

impl SessionState {
    /// A load attempt owns the session; new load requests are no-ops.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Loading | Self::Mounting | Self::RetryWait)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Mounting => "mounting",
            Self::RetryWait => "retry-wait",
            Self::Mounted => "mounted",
            Self::Unmounting => "unmounting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
