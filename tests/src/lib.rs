//! # Mosaic Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── bus_benchmarks.rs    # Dispatch and report throughput
//! └── src/integration/         # Loader + boundary + reporter + bus together
//!     ├── load_flows.rs
//!     ├── crash_isolation.rs
//!     └── reporting.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mc-tests
//! cargo test -p mc-tests integration::crash_isolation
//! cargo bench -p mc-tests
//! ```

pub mod integration;
