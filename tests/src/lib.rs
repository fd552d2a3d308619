//! # Metadata Inheritance Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Propagator and fan-out throughput
//! └── src/integration/  # Store → bus → router → scheduler → store flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p inheritance-tests
//! cargo bench -p inheritance-tests
//! ```

pub mod integration;
