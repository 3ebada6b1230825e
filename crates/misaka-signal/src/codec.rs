//! Encode/decode boundary for signals on the wire.

use bytes::Bytes;
use prost::Message;
use thiserror::Error;

use crate::MisakaSignal;

/// A payload that is not a valid `MisakaSignal`.
#[derive(Debug, Error)]
#[error("malformed signal payload ({len} bytes): {source}")]
pub struct SignalDecodeError {
    len: usize,
    #[source]
    source: prost::DecodeError,
}

impl SignalDecodeError {
    /// Size of the rejected payload.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.len
    }
}

/// Encode a signal to its wire form.
#[must_use]
pub fn encode_signal(signal: &MisakaSignal) -> Bytes {
    Bytes::from(signal.encode_to_vec())
}

/// Decode a signal from its wire form.
///
/// # Errors
///
/// Returns [`SignalDecodeError`] for truncated or structurally invalid input.
pub fn decode_signal(bytes: &[u8]) -> Result<MisakaSignal, SignalDecodeError> {
    MisakaSignal::decode(bytes).map_err(|source| SignalDecodeError {
        len: bytes.len(),
        source,
    })
}
