//! # Misaka Network Test Suite
//!
//! End-to-end telepath scenarios against the in-memory broker.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # Recording handlers, signal factories, polling helpers
//! └── integration/
//!     ├── provisioning.rs # create_telepath idempotence, retention, sequences
//!     ├── delivery.rs     # ordering, partitions, failure isolation
//!     ├── ack_policies.rs # EXPLICIT / ALL / NONE
//!     └── lifecycle.rs    # close, durable resume, metrics
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p misaka-tests
//! cargo test -p misaka-tests integration::delivery::
//! ```

#![allow(dead_code)]

pub mod fixtures;
