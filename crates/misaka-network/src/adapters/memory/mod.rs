//! In-process broker.
//!
//! `InMemoryServer` plays the broker: it holds streams and durable
//! consumers. `InMemoryBroker` is one connection to it. Streams and
//! consumers outlive connections, so closing one connection and opening
//! another resumes delivery the way a reconnecting client would.

mod consumer;
mod stream;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use self::consumer::{DurableConsumer, NextDelivery};
use self::stream::StoredStream;
use crate::domain::{subject_matches, subjects_overlap, ConsumerSpec, StreamSpec};
use crate::error::BrokerError;
use crate::ports::{
    Acknowledger, BrokerConnection, InboundMessage, MessageFeed, PublishAck, StreamStatus,
};

pub use self::consumer::ConsumerInfo;
pub use self::stream::StreamInfo;

/// Buffered messages per subscription feed.
pub const DEFAULT_FEED_CAPACITY: usize = 64;

#[derive(Default)]
struct ServerState {
    streams: Mutex<HashMap<String, StoredStream>>,
    next_connection_id: AtomicU64,
}

/// Shared broker state. Cloning shares the same server.
#[derive(Clone, Default)]
pub struct InMemoryServer {
    state: Arc<ServerState>,
}

impl InMemoryServer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection.
    #[must_use]
    pub fn connect(&self) -> InMemoryBroker {
        let id = self.state.next_connection_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (shutdown, _) = watch::channel(false);
        debug!(connection = id, "In-memory connection opened");
        InMemoryBroker {
            id,
            state: Arc::clone(&self.state),
            shutdown,
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn stream_info(&self, stream: &str) -> Option<StreamInfo> {
        self.state.streams.lock().get(stream).map(StoredStream::info)
    }

    #[must_use]
    pub fn consumer_info(&self, stream: &str, consumer: &str) -> Option<ConsumerInfo> {
        self.state
            .streams
            .lock()
            .get(stream)?
            .consumers
            .get(consumer)
            .map(DurableConsumer::info)
    }

    #[must_use]
    pub fn stream_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.streams.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

/// One connection to an [`InMemoryServer`].
pub struct InMemoryBroker {
    id: u64,
    state: Arc<ServerState>,
    shutdown: watch::Sender<bool>,
    closed: AtomicBool,
}

impl InMemoryBroker {
    #[must_use]
    pub fn connection_id(&self) -> u64 {
        self.id
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::Acquire) {
            Err(BrokerError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn provision(&self, spec: &StreamSpec) -> Result<StreamStatus, BrokerError> {
        if !is_valid_stream_name(&spec.name) {
            return Err(BrokerError::Other(format!(
                "invalid stream name {:?}",
                spec.name
            )));
        }

        let mut streams = self.state.streams.lock();
        if let Some(existing) = streams.get(&spec.name) {
            return if existing.spec == *spec {
                Ok(StreamStatus::AlreadyExists)
            } else {
                Err(BrokerError::StreamConfigMismatch {
                    stream: spec.name.clone(),
                })
            };
        }

        for (name, other) in streams.iter() {
            let overlaps = spec.subjects.iter().any(|subject| {
                other
                    .spec
                    .subjects
                    .iter()
                    .any(|existing| subjects_overlap(subject, existing))
            });
            if overlaps {
                return Err(BrokerError::SubjectOverlap {
                    stream: spec.name.clone(),
                    existing: name.clone(),
                });
            }
        }

        streams.insert(spec.name.clone(), StoredStream::new(spec.clone()));
        Ok(StreamStatus::Created)
    }

    fn store(&self, subject: &str, payload: Bytes) -> Result<PublishAck, BrokerError> {
        if !is_valid_publish_subject(subject) {
            return Err(BrokerError::InvalidSubject(subject.to_string()));
        }

        let mut streams = self.state.streams.lock();
        let stream = streams
            .values_mut()
            .find(|stream| {
                stream
                    .spec
                    .subjects
                    .iter()
                    .any(|pattern| subject_matches(pattern, subject))
            })
            .ok_or_else(|| BrokerError::NoStreamForSubject(subject.to_string()))?;

        let sequence = stream.append(subject, payload, Instant::now());
        Ok(PublishAck {
            stream: stream.spec.name.clone(),
            sequence,
        })
    }

    fn bind(&self, spec: &ConsumerSpec) -> Result<Arc<Notify>, BrokerError> {
        let mut streams = self.state.streams.lock();
        let stream = streams
            .get_mut(&spec.stream)
            .ok_or_else(|| BrokerError::StreamNotFound(spec.stream.clone()))?;

        let consumer = stream
            .consumers
            .entry(spec.durable_name.clone())
            .or_insert_with(|| DurableConsumer::new(spec.clone()));
        consumer.bind(spec, self.id, Instant::now())?;
        Ok(consumer.notifier())
    }

    fn release_all(&self) {
        let mut streams = self.state.streams.lock();
        for stream in streams.values_mut() {
            for consumer in stream.consumers.values_mut() {
                consumer.unbind(self.id);
            }
        }
    }
}

#[async_trait]
impl BrokerConnection for InMemoryBroker {
    async fn create_stream(&self, spec: &StreamSpec) -> Result<StreamStatus, BrokerError> {
        self.ensure_open()?;
        self.provision(spec)
    }

    async fn publish(&self, subject: &str, payload: Bytes) -> Result<PublishAck, BrokerError> {
        self.ensure_open()?;
        let ack = self.store(subject, payload)?;
        trace!(subject, sequence = ack.sequence, "Stored message");
        Ok(ack)
    }

    async fn subscribe(&self, spec: &ConsumerSpec) -> Result<MessageFeed, BrokerError> {
        self.ensure_open()?;
        let notify = self.bind(spec)?;

        let (tx, rx) = mpsc::channel(DEFAULT_FEED_CAPACITY);
        let pump = DeliveryPump {
            connection: self.id,
            state: Arc::clone(&self.state),
            stream: spec.stream.clone(),
            consumer: spec.durable_name.clone(),
            notify,
            feed: tx,
            shutdown: self.shutdown.subscribe(),
        };
        tokio::spawn(pump.run());

        debug!(
            connection = self.id,
            consumer = spec.durable_name.as_str(),
            "Consumer bound"
        );
        Ok(rx)
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.shutdown.send_replace(true);
        self.release_all();
        debug!(connection = self.id, "In-memory connection closed");
        Ok(())
    }
}

impl Drop for InMemoryBroker {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        self.release_all();
    }
}

/// Moves deliverable messages of one bound consumer into its feed.
struct DeliveryPump {
    connection: u64,
    state: Arc<ServerState>,
    stream: String,
    consumer: String,
    notify: Arc<Notify>,
    feed: mpsc::Sender<InboundMessage>,
    shutdown: watch::Receiver<bool>,
}

enum PumpStep {
    Deliver(InboundMessage),
    Wait(Option<Instant>),
    Stop,
}

impl DeliveryPump {
    async fn run(mut self) {
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let permit = tokio::select! {
                permit = self.feed.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = self.shutdown.changed() => break,
            };

            match self.step() {
                PumpStep::Deliver(message) => permit.send(message),
                PumpStep::Wait(deadline) => {
                    drop(permit);
                    let deadline = deadline.map(sleep_until);
                    tokio::select! {
                        () = self.notify.notified() => {}
                        () = async {
                            match deadline {
                                Some(sleep) => sleep.await,
                                None => std::future::pending().await,
                            }
                        } => {}
                        _ = self.shutdown.changed() => break,
                    }
                }
                PumpStep::Stop => break,
            }
        }

        let mut streams = self.state.streams.lock();
        if let Some(consumer) = streams
            .get_mut(&self.stream)
            .and_then(|stream| stream.consumers.get_mut(&self.consumer))
        {
            consumer.unbind(self.connection);
        }
    }

    fn step(&self) -> PumpStep {
        let mut streams = self.state.streams.lock();
        let Some(stream) = streams.get_mut(&self.stream) else {
            return PumpStep::Stop;
        };
        let now = Instant::now();
        stream.log.enforce_limits(&stream.spec, now);

        let Some(consumer) = stream.consumers.get_mut(&self.consumer) else {
            return PumpStep::Stop;
        };
        if !consumer.is_bound_to(self.connection) {
            return PumpStep::Stop;
        }

        match consumer.next_delivery(&stream.log, now) {
            NextDelivery::Ready(delivery) => {
                let acker = MemoryAcker {
                    state: Arc::clone(&self.state),
                    stream: self.stream.clone(),
                    consumer: self.consumer.clone(),
                    sequence: delivery.info.stream_sequence,
                    shutdown: self.shutdown.clone(),
                };
                PumpStep::Deliver(InboundMessage::new(
                    delivery.message.subject,
                    delivery.message.payload,
                    delivery.info,
                    Box::new(acker),
                ))
            }
            NextDelivery::WaitUntil(deadline) => PumpStep::Wait(Some(deadline)),
            NextDelivery::Idle => PumpStep::Wait(None),
        }
    }
}

struct MemoryAcker {
    state: Arc<ServerState>,
    stream: String,
    consumer: String,
    sequence: u64,
    shutdown: watch::Receiver<bool>,
}

impl MemoryAcker {
    fn with_consumer(&self, apply: impl FnOnce(&mut DurableConsumer)) -> Result<(), BrokerError> {
        if *self.shutdown.borrow() {
            return Err(BrokerError::ConnectionClosed);
        }

        let mut streams = self.state.streams.lock();
        let consumer = streams
            .get_mut(&self.stream)
            .ok_or_else(|| BrokerError::StreamNotFound(self.stream.clone()))?
            .consumers
            .get_mut(&self.consumer)
            .ok_or_else(|| BrokerError::ConsumerNotFound(self.consumer.clone()))?;
        apply(consumer);
        Ok(())
    }
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(&self) -> Result<(), BrokerError> {
        self.with_consumer(|consumer| consumer.acknowledge(self.sequence))
    }

    async fn nak(&self) -> Result<(), BrokerError> {
        self.with_consumer(|consumer| consumer.reject(self.sequence, Instant::now()))
    }
}

fn is_valid_stream_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c == '.' || c == '*' || c == '>' || c.is_whitespace())
}

fn is_valid_publish_subject(subject: &str) -> bool {
    !subject.is_empty()
        && subject.split('.').all(|token| {
            !token.is_empty() && token != "*" && token != ">" && !token.contains(char::is_whitespace)
        })
}
