//! Acknowledgment policy and the per-message ack decision.

use std::fmt;
use std::str::FromStr;

/// How a subscription acknowledges deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AckPolicy {
    /// Each handled message is acked individually. Unacked messages are
    /// redelivered after the ack wait.
    #[default]
    Explicit,
    /// Nothing is acked. The broker treats delivery as final.
    None,
    /// Acking a message acks every earlier message on the consumer.
    All,
}

impl AckPolicy {
    /// Whether the dispatcher sends acks under this policy.
    #[must_use]
    pub fn requires_ack(self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::None => "none",
            Self::All => "all",
        }
    }
}

impl fmt::Display for AckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AckPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "explicit" => Ok(Self::Explicit),
            "none" => Ok(Self::None),
            "all" => Ok(Self::All),
            other => Err(format!("unknown ack policy: {other}")),
        }
    }
}

/// What happened to one delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlingOutcome {
    Handled,
    HandlerFailed,
    DecodeFailed,
}

/// What the dispatcher tells the broker about a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckAction {
    Ack,
    /// No ack. Redelivered once the ack wait runs out.
    Withhold,
    /// No ack. Redelivered right away, spending one of the consumer's
    /// `max_deliver` attempts.
    Nak,
}

/// The ack decision for every policy and outcome.
///
/// Only a handled message is ever acked. A handler failure is withheld so
/// the retry waits out the ack wait. A payload that does not decode will not
/// decode on redelivery either, so it is nak'd and burns through
/// `max_deliver` without stalling the messages queued behind it.
#[must_use]
pub fn ack_action(policy: AckPolicy, outcome: HandlingOutcome) -> AckAction {
    match (policy, outcome) {
        (AckPolicy::None, _) => AckAction::Withhold,
        (AckPolicy::Explicit | AckPolicy::All, HandlingOutcome::Handled) => AckAction::Ack,
        (AckPolicy::Explicit | AckPolicy::All, HandlingOutcome::HandlerFailed) => {
            AckAction::Withhold
        }
        (AckPolicy::Explicit | AckPolicy::All, HandlingOutcome::DecodeFailed) => AckAction::Nak,
    }
}
