//! Outbound Ports (Driven Ports)
//!
//! What the client needs from a durable publish-subscribe broker. Adapters
//! live in `crate::adapters`.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::domain::{ConsumerSpec, StreamSpec};
use crate::error::BrokerError;

/// Result of provisioning a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Created,
    /// An identical stream was already present. Nothing changed.
    AlreadyExists,
}

/// Broker confirmation of a stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    pub stream: String,
    /// Per-stream sequence, strictly increasing.
    pub sequence: u64,
}

/// Delivery metadata attached by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryInfo {
    pub stream_sequence: u64,
    pub consumer_sequence: u64,
    /// 1 on first delivery, higher on redelivery.
    pub delivered: u32,
}

impl DeliveryInfo {
    #[must_use]
    pub fn is_redelivery(&self) -> bool {
        self.delivered > 1
    }
}

/// Acknowledges one delivered message.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<(), BrokerError>;

    /// Ask for immediate redelivery instead of waiting out the ack wait.
    async fn nak(&self) -> Result<(), BrokerError>;
}

/// A raw message pushed to a durable consumer.
pub struct InboundMessage {
    subject: String,
    payload: Bytes,
    info: DeliveryInfo,
    acker: Box<dyn Acknowledger>,
}

impl InboundMessage {
    pub fn new(
        subject: impl Into<String>,
        payload: Bytes,
        info: DeliveryInfo,
        acker: Box<dyn Acknowledger>,
    ) -> Self {
        Self {
            subject: subject.into(),
            payload,
            info,
            acker,
        }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn info(&self) -> DeliveryInfo {
        self.info
    }

    /// Acknowledge under the consumer's ack policy.
    pub async fn ack(&self) -> Result<(), BrokerError> {
        self.acker.ack().await
    }

    /// Negatively acknowledge: redeliver now, counting one delivery attempt.
    pub async fn nak(&self) -> Result<(), BrokerError> {
        self.acker.nak().await
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("subject", &self.subject)
            .field("payload_len", &self.payload.len())
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Ordered, one-at-a-time delivery feed of a single consumer.
///
/// The feed ends when the connection that opened it closes.
pub type MessageFeed = mpsc::Receiver<InboundMessage>;

/// A single logical broker connection (Driven Port)
#[async_trait]
pub trait BrokerConnection: Send + Sync + 'static {
    /// Provision a stream. Identical configuration is a no-op; a differing
    /// one is `BrokerError::StreamConfigMismatch`.
    async fn create_stream(&self, spec: &StreamSpec) -> Result<StreamStatus, BrokerError>;

    /// Store `payload` under `subject` in whichever stream captures it.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<PublishAck, BrokerError>;

    /// Bind, creating on first use, the durable consumer in `spec`.
    async fn subscribe(&self, spec: &ConsumerSpec) -> Result<MessageFeed, BrokerError>;

    /// Close the connection and end every feed it opened.
    async fn close(&self) -> Result<(), BrokerError>;
}
