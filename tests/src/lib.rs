//! # Composition Service Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── flows.rs        # Multi-level valuation through the engine API
//! │   ├── http_api.rs     # Full HTTP round trips through the gateway router
//! │   └── persistence.rs  # File snapshots, restart and re-validation
//! └── benches/
//!     └── propagation_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cs-tests
//! cargo bench -p cs-tests
//! ```

pub mod integration;
