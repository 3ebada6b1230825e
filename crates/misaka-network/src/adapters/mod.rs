//! Adapters Layer
//!
//! - `memory`: in-process broker with stream and durable consumer semantics
//! - `nats`: NATS JetStream (feature `nats`)

pub mod memory;

#[cfg(feature = "nats")]
pub mod nats;
