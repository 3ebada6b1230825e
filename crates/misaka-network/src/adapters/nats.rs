//! NATS JetStream adapter.
//!
//! Streams map one-to-one onto JetStream streams. Subscriptions bind a
//! durable pull consumer and forward its message stream into a feed, so the
//! delivery loop sees the same ordered channel as with the in-memory broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_nats::jetstream::{self, consumer, stream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::memory::DEFAULT_FEED_CAPACITY;
use crate::domain::{AckPolicy, ConsumerSpec, DiscardPolicy, StorageClass, StreamSpec};
use crate::error::{BrokerError, ConnectionError};
use crate::ports::{
    Acknowledger, BrokerConnection, DeliveryInfo, InboundMessage, MessageFeed, PublishAck,
    StreamStatus,
};

pub struct NatsBroker {
    client: async_nats::Client,
    context: jetstream::Context,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl NatsBroker {
    /// # Errors
    ///
    /// `ConnectionError::Connect` if the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, ConnectionError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| ConnectionError::Connect {
                address: url.to_string(),
                reason: e.to_string(),
            })?;
        let context = jetstream::new(client.clone());
        info!(url, "Connected to NATS");

        Ok(Self {
            client,
            context,
            forwarders: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::Acquire) {
            Err(BrokerError::ConnectionClosed)
        } else {
            Ok(())
        }
    }
}

fn stream_config(spec: &StreamSpec) -> stream::Config {
    stream::Config {
        name: spec.name.clone(),
        subjects: spec.subjects.clone(),
        max_age: spec.max_age,
        max_messages: normalize_limit(spec.max_messages),
        max_bytes: normalize_limit(spec.max_bytes),
        storage: match spec.storage {
            StorageClass::Memory => stream::StorageType::Memory,
            StorageClass::File => stream::StorageType::File,
        },
        retention: stream::RetentionPolicy::Limits,
        discard: match spec.discard {
            DiscardPolicy::Old => stream::DiscardPolicy::Old,
            DiscardPolicy::New => stream::DiscardPolicy::New,
        },
        num_replicas: spec.num_replicas,
        ..Default::default()
    }
}

/// The server stores "no limit" as -1.
fn normalize_limit(limit: i64) -> i64 {
    if limit <= 0 {
        -1
    } else {
        limit
    }
}

fn same_stream(existing: &stream::Config, wanted: &stream::Config) -> bool {
    existing.subjects == wanted.subjects
        && existing.max_age == wanted.max_age
        && normalize_limit(existing.max_messages) == wanted.max_messages
        && normalize_limit(existing.max_bytes) == wanted.max_bytes
        && existing.storage == wanted.storage
        && existing.retention == wanted.retention
        && existing.discard == wanted.discard
        && existing.num_replicas == wanted.num_replicas
}

fn consumer_ack_policy(policy: AckPolicy) -> consumer::AckPolicy {
    match policy {
        AckPolicy::Explicit => consumer::AckPolicy::Explicit,
        AckPolicy::None => consumer::AckPolicy::None,
        AckPolicy::All => consumer::AckPolicy::All,
    }
}

fn other<E: std::fmt::Display>(err: E) -> BrokerError {
    BrokerError::Other(err.to_string())
}

#[async_trait]
impl BrokerConnection for NatsBroker {
    async fn create_stream(&self, spec: &StreamSpec) -> Result<StreamStatus, BrokerError> {
        self.ensure_open()?;
        let wanted = stream_config(spec);

        if let Ok(mut existing) = self.context.get_stream(&spec.name).await {
            let info = existing.info().await.map_err(other)?;
            return if same_stream(&info.config, &wanted) {
                Ok(StreamStatus::AlreadyExists)
            } else {
                Err(BrokerError::StreamConfigMismatch {
                    stream: spec.name.clone(),
                })
            };
        }

        self.context.create_stream(wanted).await.map_err(other)?;
        Ok(StreamStatus::Created)
    }

    async fn publish(&self, subject: &str, payload: Bytes) -> Result<PublishAck, BrokerError> {
        self.ensure_open()?;
        let ack = self
            .context
            .publish(subject.to_string(), payload)
            .await
            .map_err(other)?
            .await
            .map_err(other)?;

        Ok(PublishAck {
            stream: ack.stream,
            sequence: ack.sequence,
        })
    }

    async fn subscribe(&self, spec: &ConsumerSpec) -> Result<MessageFeed, BrokerError> {
        self.ensure_open()?;
        let stream = self
            .context
            .get_stream(&spec.stream)
            .await
            .map_err(|_| BrokerError::StreamNotFound(spec.stream.clone()))?;

        let config = consumer::pull::Config {
            durable_name: Some(spec.durable_name.clone()),
            filter_subject: spec.filter_subject.clone(),
            ack_policy: consumer_ack_policy(spec.ack_policy),
            ack_wait: spec.ack_wait,
            max_ack_pending: i64::from(spec.max_ack_pending),
            max_deliver: spec.max_deliver.map_or(-1, i64::from),
            ..Default::default()
        };
        let durable = stream
            .get_or_create_consumer(&spec.durable_name, config)
            .await
            .map_err(other)?;

        let existing = &durable.cached_info().config;
        if existing.ack_policy != consumer_ack_policy(spec.ack_policy)
            || existing.filter_subject != spec.filter_subject
        {
            return Err(BrokerError::ConsumerConfigMismatch {
                consumer: spec.durable_name.clone(),
            });
        }

        let mut messages = durable.messages().await.map_err(other)?;
        let (tx, rx) = mpsc::channel(DEFAULT_FEED_CAPACITY);
        let consumer_name = spec.durable_name.clone();

        let forwarder = tokio::spawn(async move {
            while let Some(next) = messages.next().await {
                let message = match next {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(
                            consumer = consumer_name.as_str(),
                            error = %err,
                            "Consumer stream error"
                        );
                        continue;
                    }
                };
                let info = match message.info() {
                    Ok(info) => DeliveryInfo {
                        stream_sequence: info.stream_sequence,
                        consumer_sequence: info.consumer_sequence,
                        delivered: u32::try_from(info.delivered).unwrap_or(u32::MAX),
                    },
                    Err(err) => {
                        warn!(
                            consumer = consumer_name.as_str(),
                            error = %err,
                            "Message without delivery metadata"
                        );
                        continue;
                    }
                };
                let inbound = InboundMessage::new(
                    message.subject.to_string(),
                    message.payload.clone(),
                    info,
                    Box::new(NatsAcker { message }),
                );
                if tx.send(inbound).await.is_err() {
                    break;
                }
            }
            debug!(consumer = consumer_name.as_str(), "Consumer forwarder stopped");
        });
        self.forwarders.lock().push(forwarder);

        Ok(rx)
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for forwarder in self.forwarders.lock().drain(..) {
            forwarder.abort();
        }
        tokio::time::timeout(Duration::from_secs(5), self.client.flush())
            .await
            .map_err(other)?
            .map_err(other)?;
        Ok(())
    }
}

struct NatsAcker {
    message: jetstream::Message,
}

#[async_trait]
impl Acknowledger for NatsAcker {
    async fn ack(&self) -> Result<(), BrokerError> {
        self.message.ack().await.map_err(other)
    }

    async fn nak(&self) -> Result<(), BrokerError> {
        self.message
            .ack_with(jetstream::AckKind::Nak(None))
            .await
            .map_err(other)
    }
}
