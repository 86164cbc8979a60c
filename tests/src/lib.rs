//! # Access-Gate Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs     # wired world, in-memory or on disk
//!     ├── lifecycle.rs    # submit -> disposition -> gate, invariants
//!     ├── concurrency.rs  # racing operators, racing approvals
//!     ├── gating.rs       # withdrawal authorization and execution
//!     ├── referrals.rs    # once-only crediting, reconciliation
//!     ├── durability.rs   # file-backed store across a restart
//!     └── realtime.rs     # event addressing and per-record ordering
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ac-tests
//! cargo test -p ac-tests integration::concurrency::
//! cargo bench -p ac-tests
//! ```

#![allow(dead_code)]

pub mod integration;
