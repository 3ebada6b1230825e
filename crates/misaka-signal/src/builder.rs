//! Signal composition.

use std::time::SystemTime;

use crate::{AuthorityLevel, MisakaSignal};

/// Fluent builder for outgoing signals.
///
/// `build()` stamps a fresh v4 `uuid` and the current wall-clock time.
///
/// ```ignore
/// let signal = SignalBuilder::new("trading_agent")
///     .authority(AuthorityLevel::Lv2)
///     .content_type("parsed_transaction")
///     .payload(bytes)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct SignalBuilder {
    sender_agent: String,
    parent_uuid: String,
    authority: i32,
    content_type: String,
    payload: Vec<u8>,
}

impl SignalBuilder {
    /// Start a signal sent by `sender_agent` at authority `LV0`.
    pub fn new(sender_agent: impl Into<String>) -> Self {
        Self {
            sender_agent: sender_agent.into(),
            parent_uuid: String::new(),
            authority: AuthorityLevel::Lv0 as i32,
            content_type: String::new(),
            payload: Vec::new(),
        }
    }

    /// Set a labelled authority level.
    pub fn authority(mut self, level: AuthorityLevel) -> Self {
        self.authority = level as i32;
        self
    }

    /// Set a raw authority value, including levels beyond the labelled range.
    pub fn authority_value(mut self, value: u32) -> Self {
        self.authority = i32::try_from(value).unwrap_or(i32::MAX);
        self
    }

    /// Correlate with a previous signal.
    pub fn parent(mut self, parent_uuid: impl Into<String>) -> Self {
        self.parent_uuid = parent_uuid.into();
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Finish the signal.
    #[must_use]
    pub fn build(self) -> MisakaSignal {
        MisakaSignal {
            timestamp: Some(prost_types::Timestamp::from(SystemTime::now())),
            uuid: uuid::Uuid::new_v4().to_string(),
            parent_uuid: self.parent_uuid,
            sender_agent: self.sender_agent,
            authority: self.authority,
            content_type: self.content_type,
            payload: self.payload,
        }
    }
}
