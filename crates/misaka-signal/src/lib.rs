//! # Misaka Signal
//!
//! The message exchanged between agents over telepaths.
//!
//! The schema lives in `proto/misaka_signal.proto`; the generated prost code is
//! checked in under `src/generated`. Everything above the broker treats a
//! signal as opaque except for its `authority` field, which selects the
//! partition a signal is published into.
//!
//! ## Wire Boundary
//!
//! - [`encode_signal`] is total: every signal encodes.
//! - [`decode_signal`] rejects malformed payloads with [`SignalDecodeError`].

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

#[allow(clippy::all)]
#[rustfmt::skip]
mod generated {
    include!("generated/misaka_network_v2.rs");
}

pub mod authority;
pub mod builder;
pub mod codec;

pub use builder::SignalBuilder;
pub use codec::{decode_signal, encode_signal, SignalDecodeError};
pub use generated::misaka_signal;
pub use generated::MisakaSignal;
pub use generated::misaka_signal::AuthorityLevel;

/// Protobuf package the schema is published under.
pub const SCHEMA_PACKAGE: &str = "misaka_network_v2";
