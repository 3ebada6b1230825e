//! Durable consumer specification and lifecycle.

use std::fmt;
use std::time::Duration;

use super::ack::AckPolicy;
use super::telepath::TelepathName;
use crate::error::SubscriptionError;

/// Default time the broker waits for an ack before redelivering.
pub const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(30);

/// Default number of unacknowledged messages a consumer may have in flight.
///
/// One keeps a failed message ahead of every later message.
pub const DEFAULT_MAX_ACK_PENDING: u32 = 1;

/// Default delivery attempts per message before the broker gives up.
pub const DEFAULT_MAX_DELIVER: u32 = 5;

/// Delivery tuning for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub ack_wait: Duration,
    pub max_ack_pending: u32,
    /// `None` redelivers until the message is acked or expires.
    pub max_deliver: Option<u32>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            ack_wait: DEFAULT_ACK_WAIT,
            max_ack_pending: DEFAULT_MAX_ACK_PENDING,
            max_deliver: Some(DEFAULT_MAX_DELIVER),
        }
    }
}

impl SubscribeOptions {
    /// # Errors
    ///
    /// `SubscriptionError::InvalidOptions` for a zero ack wait, zero
    /// `max_ack_pending` or zero `max_deliver`.
    pub fn validate(&self) -> Result<(), SubscriptionError> {
        if self.ack_wait.is_zero() {
            return Err(SubscriptionError::InvalidOptions(
                "ack_wait must be positive".to_string(),
            ));
        }
        if self.max_ack_pending == 0 {
            return Err(SubscriptionError::InvalidOptions(
                "max_ack_pending must be at least 1".to_string(),
            ));
        }
        if self.max_deliver == Some(0) {
            return Err(SubscriptionError::InvalidOptions(
                "max_deliver must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Durable push consumer configuration handed to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSpec {
    pub stream: String,
    pub durable_name: String,
    pub filter_subject: String,
    pub ack_policy: AckPolicy,
    pub ack_wait: Duration,
    pub max_ack_pending: u32,
    pub max_deliver: Option<u32>,
}

impl ConsumerSpec {
    #[must_use]
    pub fn for_telepath(
        name: &TelepathName,
        ack_policy: AckPolicy,
        options: &SubscribeOptions,
    ) -> Self {
        Self {
            stream: name.stream_name(),
            durable_name: name.consumer_name(),
            filter_subject: name.subject_prefix(),
            ack_policy,
            ack_wait: options.ack_wait,
            max_ack_pending: options.max_ack_pending,
            max_deliver: options.max_deliver,
        }
    }
}

/// Lifecycle of a subscription.
///
/// `Subscribed` lasts until the owning connection closes. There is no
/// pause or resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumerState {
    Unsubscribed,
    Subscribed,
    Closed,
}

impl ConsumerState {
    #[must_use]
    pub fn can_transition_to(self, next: ConsumerState) -> bool {
        matches!(
            (self, next),
            (Self::Unsubscribed, Self::Subscribed) | (Self::Subscribed, Self::Closed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unsubscribed => "unsubscribed",
            Self::Subscribed => "subscribed",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}
