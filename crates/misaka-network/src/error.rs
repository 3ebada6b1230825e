//! Error types for the Misaka Network client
//!
//! Only connection- and provisioning-level failures reach callers. Decode and
//! handler failures during delivery are contained by the dispatcher and
//! surface through logs and metrics.

use thiserror::Error;

pub use misaka_signal::SignalDecodeError as DecodeError;

/// Errors returned by the public client API
#[derive(Debug, Error)]
pub enum TelepathError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    StreamConfig(#[from] StreamConfigError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error("Invalid telepath name {name:?}: {reason}")]
    InvalidTelepathName { name: String, reason: &'static str },

    #[error("Invalid authority level {0}: must be non-negative")]
    InvalidAuthority(i32),
}

/// Connection lifecycle failures. Fatal to the client instance.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("Connection is closed")]
    Closed,

    #[error("Failed to close connection: {0}")]
    Close(String),
}

/// Telepath provisioning failures. Never retried.
#[derive(Debug, Error)]
pub enum StreamConfigError {
    #[error("Telepath {telepath} already exists with a different configuration")]
    AlreadyExistsWithDifferentConfig { telepath: String },

    #[error("Invalid {field}: {value}")]
    InvalidLimit { field: &'static str, value: i64 },

    #[error("Broker rejected stream {stream}: {source}")]
    Broker {
        stream: String,
        #[source]
        source: BrokerError,
    },
}

/// A publish the broker did not accept. One attempt per emit.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Broker rejected publish to {subject}: {source}")]
    Rejected {
        subject: String,
        #[source]
        source: BrokerError,
    },
}

/// Failures installing a subscription
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Telepath {telepath} already has an active subscription on this client")]
    AlreadySubscribed { telepath: String },

    #[error("Invalid subscribe options: {0}")]
    InvalidOptions(String),

    #[error("Broker rejected consumer {consumer}: {source}")]
    Broker {
        consumer: String,
        #[source]
        source: BrokerError,
    },
}

/// Errors from the broker connection port
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Stream {stream} already exists with a different configuration")]
    StreamConfigMismatch { stream: String },

    #[error("Stream {0} not found")]
    StreamNotFound(String),

    #[error("Subjects of stream {stream} overlap with existing stream {existing}")]
    SubjectOverlap { stream: String, existing: String },

    #[error("No stream accepts subject {0}")]
    NoStreamForSubject(String),

    #[error("Invalid subject {0:?}")]
    InvalidSubject(String),

    #[error("Consumer {consumer} already exists with a different configuration")]
    ConsumerConfigMismatch { consumer: String },

    #[error("Consumer {consumer} is bound to another connection")]
    ConsumerInUse { consumer: String },

    #[error("Consumer {0} not found")]
    ConsumerNotFound(String),

    #[error("Broker error: {0}")]
    Other(String),
}

/// Failure reported by a signal handler.
///
/// The dispatcher withholds the acknowledgment, so the broker redelivers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct HandlerError {
    reason: String,
}

impl HandlerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<String> for HandlerError {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}

impl From<&str> for HandlerError {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}
