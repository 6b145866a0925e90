//! # Isolation Boundary (mc-02)
//!
//! Failure containment for mounted remote modules. A crashing module moves
//! its boundary to a crashed display state instead of taking the host down.
//!
//! ```text
//! host ──run(f)──→ [IsolationBoundary] ──f()──→ remote module
//!                        │  Err / panic
//!                        ↓
//!               ErrorReporter (runtime)  +  Crashed view
//!                        │  retry()
//!                        ↓
//!                 Recovery hook (loader manual retry)
//! ```

pub mod boundary;
pub mod error;

pub use boundary::{contain, BoundaryView, IsolationBoundary, Recovery};
pub use error::BoundaryError;
