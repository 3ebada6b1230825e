//! Stream provisioning policy.
//!
//! Every telepath stream is bounded, memory-backed and single-replica. When a
//! cap is hit the oldest message is discarded, never the newest. Streams are
//! for soft-real-time fanout; nothing survives a full broker restart.

use std::time::Duration;

use super::config::TelepathConfig;
use super::telepath::TelepathName;

/// Where the broker keeps stream data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Memory,
    File,
}

/// How the broker decides a message may be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Kept until a count, size or age limit removes it.
    Limits,
}

/// What happens when a limit is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardPolicy {
    /// Drop the oldest message to make room.
    Old,
    /// Reject the new message.
    New,
}

/// Full stream configuration handed to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    pub name: String,
    pub subjects: Vec<String>,
    /// Zero means no age limit.
    pub max_age: Duration,
    /// Zero or negative means no count limit.
    pub max_messages: i64,
    /// Zero or negative means no size limit.
    pub max_bytes: i64,
    pub storage: StorageClass,
    pub retention: RetentionPolicy,
    pub discard: DiscardPolicy,
    pub num_replicas: usize,
}

impl StreamSpec {
    /// Stream configuration for a telepath.
    ///
    /// Retention limits are passed through verbatim; storage, retention,
    /// discard and replica count are fixed.
    #[must_use]
    pub fn for_telepath(name: &TelepathName, config: &TelepathConfig) -> Self {
        Self {
            name: name.stream_name(),
            subjects: vec![name.subject_prefix()],
            max_age: config.ttl,
            max_messages: config.max_messages,
            max_bytes: config.max_bytes,
            storage: StorageClass::Memory,
            retention: RetentionPolicy::Limits,
            discard: DiscardPolicy::Old,
            num_replicas: 1,
        }
    }
}
