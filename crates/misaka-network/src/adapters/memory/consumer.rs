//! Durable consumer state held by the in-memory server.
//!
//! A consumer outlives the connections that bind it. Its cursor and pending
//! set survive reconnects, so a restarted subscriber resumes where the last
//! one stopped.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::time::Instant;

use super::stream::{MessageLog, StoredMessage};
use crate::domain::{AckPolicy, ConsumerSpec};
use crate::error::BrokerError;
use crate::ports::DeliveryInfo;

#[derive(Debug, Clone, Copy)]
struct Pending {
    deliveries: u32,
    deadline: Instant,
}

/// A message ready to push to the bound subscriber.
#[derive(Debug)]
pub(crate) struct Delivery {
    pub message: StoredMessage,
    pub info: DeliveryInfo,
}

#[derive(Debug)]
pub(crate) enum NextDelivery {
    Ready(Delivery),
    /// Nothing deliverable before this instant.
    WaitUntil(Instant),
    /// Nothing deliverable until a publish or ack.
    Idle,
}

pub(crate) struct DurableConsumer {
    spec: ConsumerSpec,
    /// Next stream sequence never delivered before.
    next_sequence: u64,
    consumer_sequence: u64,
    pending: BTreeMap<u64, Pending>,
    redelivered: u64,
    bound_to: Option<u64>,
    notify: Arc<Notify>,
}

impl DurableConsumer {
    pub fn new(spec: ConsumerSpec) -> Self {
        Self {
            spec,
            next_sequence: 1,
            consumer_sequence: 0,
            pending: BTreeMap::new(),
            redelivered: 0,
            bound_to: None,
            notify: Arc::new(Notify::new()),
        }
    }

    #[cfg(test)]
    pub fn spec(&self) -> &ConsumerSpec {
        &self.spec
    }

    pub fn notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    pub fn wake(&self) {
        self.notify.notify_one();
    }

    /// Attach a connection.
    ///
    /// Filter and ack policy are fixed at creation. Delivery tunables follow
    /// the latest subscriber. Messages left pending by an earlier
    /// connection become due immediately.
    pub fn bind(
        &mut self,
        spec: &ConsumerSpec,
        connection: u64,
        now: Instant,
    ) -> Result<(), BrokerError> {
        if spec.filter_subject != self.spec.filter_subject || spec.ack_policy != self.spec.ack_policy
        {
            return Err(BrokerError::ConsumerConfigMismatch {
                consumer: self.spec.durable_name.clone(),
            });
        }
        if self.bound_to.is_some() {
            return Err(BrokerError::ConsumerInUse {
                consumer: self.spec.durable_name.clone(),
            });
        }

        self.spec.ack_wait = spec.ack_wait;
        self.spec.max_ack_pending = spec.max_ack_pending;
        self.spec.max_deliver = spec.max_deliver;
        self.bound_to = Some(connection);
        for pending in self.pending.values_mut() {
            pending.deadline = now;
        }
        self.wake();
        Ok(())
    }

    /// Detach `connection` if it is the one bound.
    pub fn unbind(&mut self, connection: u64) {
        if self.bound_to == Some(connection) {
            self.bound_to = None;
        }
    }

    pub fn is_bound_to(&self, connection: u64) -> bool {
        self.bound_to == Some(connection)
    }

    pub fn next_delivery(&mut self, log: &MessageLog, now: Instant) -> NextDelivery {
        let first = log.first_sequence();

        // Pending messages the stream has already discarded are gone for good.
        self.pending.retain(|sequence, _| *sequence >= first);

        let due: Vec<(u64, Pending)> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(sequence, pending)| (*sequence, *pending))
            .collect();
        for (sequence, pending) in due {
            if self
                .spec
                .max_deliver
                .is_some_and(|max| pending.deliveries >= max)
            {
                self.pending.remove(&sequence);
                continue;
            }
            if let Some(message) = log.get(sequence) {
                let deliveries = pending.deliveries + 1;
                self.pending.insert(
                    sequence,
                    Pending {
                        deliveries,
                        deadline: now + self.spec.ack_wait,
                    },
                );
                self.redelivered += 1;
                return NextDelivery::Ready(self.delivery(message.clone(), deliveries));
            }
        }

        let tracks_acks = self.spec.ack_policy.requires_ack();
        let has_room = !tracks_acks || self.pending.len() < self.spec.max_ack_pending as usize;
        if has_room {
            self.next_sequence = self.next_sequence.max(first);
            if let Some(message) = log.get(self.next_sequence) {
                let message = message.clone();
                self.next_sequence += 1;
                if tracks_acks {
                    self.pending.insert(
                        message.sequence,
                        Pending {
                            deliveries: 1,
                            deadline: now + self.spec.ack_wait,
                        },
                    );
                }
                return NextDelivery::Ready(self.delivery(message, 1));
            }
        }

        self.pending
            .values()
            .map(|pending| pending.deadline)
            .min()
            .map_or(NextDelivery::Idle, NextDelivery::WaitUntil)
    }

    fn delivery(&mut self, message: StoredMessage, delivered: u32) -> Delivery {
        self.consumer_sequence += 1;
        Delivery {
            info: DeliveryInfo {
                stream_sequence: message.sequence,
                consumer_sequence: self.consumer_sequence,
                delivered,
            },
            message,
        }
    }

    pub fn acknowledge(&mut self, sequence: u64) {
        match self.spec.ack_policy {
            AckPolicy::Explicit => {
                self.pending.remove(&sequence);
            }
            AckPolicy::All => self.pending.retain(|pending, _| *pending > sequence),
            AckPolicy::None => {}
        }
        self.wake();
    }

    /// Make an unacked message due for redelivery at `now` instead of after
    /// the ack wait.
    pub fn reject(&mut self, sequence: u64, now: Instant) {
        if let Some(pending) = self.pending.get_mut(&sequence) {
            pending.deadline = now;
            self.wake();
        }
    }

    pub fn info(&self) -> ConsumerInfo {
        ConsumerInfo {
            name: self.spec.durable_name.clone(),
            stream: self.spec.stream.clone(),
            ack_policy: self.spec.ack_policy,
            delivered_sequence: self.next_sequence.saturating_sub(1),
            num_ack_pending: self.pending.len(),
            num_redelivered: self.redelivered,
            bound: self.bound_to.is_some(),
        }
    }
}

/// Snapshot of a durable consumer's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerInfo {
    pub name: String,
    pub stream: String,
    pub ack_policy: AckPolicy,
    /// Highest stream sequence delivered at least once.
    pub delivered_sequence: u64,
    pub num_ack_pending: usize,
    pub num_redelivered: u64,
    pub bound: bool,
}
