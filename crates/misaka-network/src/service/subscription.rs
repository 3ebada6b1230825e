//! Subscription handles and per-subscription delivery counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use super::dispatcher::DispatchOutcome;
use crate::domain::{AckPolicy, ConsumerState, TelepathName};

/// Counters for one subscription.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    acknowledged: AtomicU64,
    decode_failures: AtomicU64,
    handler_failures: AtomicU64,
    ack_failures: AtomicU64,
}

/// Move a subscription to `next` if the lifecycle allows it.
///
/// Returns `false`, leaving the state untouched, for an illegal transition.
pub(crate) fn advance_state(state: &watch::Sender<ConsumerState>, next: ConsumerState) -> bool {
    state.send_if_modified(|current| {
        if current.can_transition_to(next) {
            *current = next;
            true
        } else {
            false
        }
    })
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStatsSnapshot {
    pub delivered: u64,
    pub acknowledged: u64,
    pub decode_failures: u64,
    pub handler_failures: u64,
    pub ack_failures: u64,
}

impl DeliveryStats {
    pub(crate) fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Acknowledged => &self.acknowledged,
            DispatchOutcome::DecodeFailed => &self.decode_failures,
            DispatchOutcome::HandlerFailed => &self.handler_failures,
            DispatchOutcome::AckFailed => &self.ack_failures,
            DispatchOutcome::Handled => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> DeliveryStatsSnapshot {
        DeliveryStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            ack_failures: self.ack_failures.load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running subscription.
///
/// Dropping the handle does not stop delivery. A subscription ends only
/// when its connection closes.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    telepath: TelepathName,
    consumer: String,
    ack_policy: AckPolicy,
    state: watch::Receiver<ConsumerState>,
    stats: Arc<DeliveryStats>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        telepath: TelepathName,
        ack_policy: AckPolicy,
        state: watch::Receiver<ConsumerState>,
        stats: Arc<DeliveryStats>,
    ) -> Self {
        let consumer = telepath.consumer_name();
        Self {
            telepath,
            consumer,
            ack_policy,
            state,
            stats,
        }
    }

    #[must_use]
    pub fn telepath(&self) -> &TelepathName {
        &self.telepath
    }

    #[must_use]
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    #[must_use]
    pub fn ack_policy(&self) -> AckPolicy {
        self.ack_policy
    }

    #[must_use]
    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn stats(&self) -> DeliveryStatsSnapshot {
        self.stats.snapshot()
    }

    /// Wait until the subscription has stopped delivering.
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        // An error means the delivery task is gone, which is also closed.
        let _ = state.wait_for(|s| s.is_terminal()).await;
    }
}
