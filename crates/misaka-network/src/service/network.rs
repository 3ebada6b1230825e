//! The telepath client.
//!
//! One `MisakaNetwork` owns one broker connection. Operations share the
//! connection under a read lock; `close` takes the write lock, so it waits
//! for in-flight operations and nothing starts after it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use misaka_signal::{encode_signal, MisakaSignal};
use misaka_telemetry::metrics::{MetricsRecorder, NoOpMetrics};
use parking_lot::Mutex;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, info_span, warn, Instrument};

use super::dispatcher::DeliveryDispatcher;
use super::subscription::{advance_state, DeliveryStats, SubscriptionHandle};
use crate::config::NetworkConfig;
use crate::domain::{
    resolve_publish_subject, AckPolicy, ConsumerSpec, ConsumerState, StreamSpec,
    SubscribeOptions, TelepathConfig, TelepathName,
};
use crate::error::{
    BrokerError, ConnectionError, PublishError, StreamConfigError, SubscriptionError,
    TelepathError,
};
use crate::ports::{BrokerConnection, SignalHandler, StreamStatus, TelepathApi};

pub struct MisakaNetwork<B: BrokerConnection> {
    broker: Arc<B>,
    /// Read for operations, write for close.
    link: RwLock<()>,
    closed: AtomicBool,
    close_signal: watch::Sender<bool>,
    /// Telepaths with a running delivery loop on this client.
    active: Arc<Mutex<HashSet<TelepathName>>>,
    metrics: Arc<dyn MetricsRecorder>,
    telepath_defaults: TelepathConfig,
    subscribe_options: SubscribeOptions,
}

impl<B: BrokerConnection> MisakaNetwork<B> {
    /// Wrap an established broker connection.
    pub fn new(broker: B) -> Self {
        let (close_signal, _) = watch::channel(false);
        Self {
            broker: Arc::new(broker),
            link: RwLock::new(()),
            closed: AtomicBool::new(false),
            close_signal,
            active: Arc::new(Mutex::new(HashSet::new())),
            metrics: Arc::new(NoOpMetrics),
            telepath_defaults: TelepathConfig::default(),
            subscribe_options: SubscribeOptions::default(),
        }
    }

    /// Wrap a connection and take telepath and subscription defaults from
    /// `config`.
    pub fn with_config(broker: B, config: &NetworkConfig) -> Self {
        Self::new(broker)
            .with_telepath_defaults(config.telepath)
            .with_subscribe_options(config.subscribe)
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn with_telepath_defaults(mut self, config: TelepathConfig) -> Self {
        self.telepath_defaults = config;
        self
    }

    #[must_use]
    pub fn with_subscribe_options(mut self, options: SubscribeOptions) -> Self {
        self.subscribe_options = options;
        self
    }

    #[must_use]
    pub fn broker(&self) -> &B {
        &self.broker
    }

    #[must_use]
    pub fn telepath_defaults(&self) -> &TelepathConfig {
        &self.telepath_defaults
    }

    /// `create_telepath` with the client's default retention limits.
    pub async fn create_telepath_with_defaults(&self, name: &str) -> Result<(), TelepathError> {
        let config = self.telepath_defaults;
        self.create_telepath(name, &config).await
    }

    /// `subscribe_telepath` with explicit delivery tuning.
    pub async fn subscribe_telepath_with<H>(
        &self,
        name: &str,
        handler: H,
        ack_policy: AckPolicy,
        options: SubscribeOptions,
    ) -> Result<SubscriptionHandle, TelepathError>
    where
        H: SignalHandler,
    {
        let telepath = TelepathName::new(name)?;
        options.validate()?;

        let _link = self.link.read().await;
        self.ensure_open()?;

        if !self.active.lock().insert(telepath.clone()) {
            return Err(SubscriptionError::AlreadySubscribed {
                telepath: telepath.to_string(),
            }
            .into());
        }

        let spec = ConsumerSpec::for_telepath(&telepath, ack_policy, &options);
        let feed = match self.broker.subscribe(&spec).await {
            Ok(feed) => feed,
            Err(err) => {
                self.active.lock().remove(&telepath);
                return Err(match err {
                    BrokerError::ConnectionClosed => ConnectionError::Closed.into(),
                    source => SubscriptionError::Broker {
                        consumer: spec.durable_name,
                        source,
                    }
                    .into(),
                });
            }
        };

        let (state_tx, state_rx) = watch::channel(ConsumerState::Unsubscribed);
        advance_state(&state_tx, ConsumerState::Subscribed);

        let stats = Arc::new(DeliveryStats::default());
        let dispatcher = DeliveryDispatcher::new(
            telepath.clone(),
            ack_policy,
            handler,
            Arc::clone(&self.metrics),
            Arc::clone(&stats),
        )
        .with_max_deliver(options.max_deliver);
        let handle = SubscriptionHandle::new(telepath.clone(), ack_policy, state_rx, stats);

        let shutdown = self.close_signal.subscribe();
        let active = Arc::clone(&self.active);
        let span = info_span!(
            "subscription",
            telepath = telepath.as_str(),
            consumer = spec.durable_name.as_str()
        );

        info!(
            telepath = telepath.as_str(),
            consumer = spec.durable_name.as_str(),
            ack_policy = %ack_policy,
            "Subscribed to telepath"
        );

        tokio::spawn(
            async move {
                dispatcher.run(feed, shutdown).await;
                active.lock().remove(&telepath);
                advance_state(&state_tx, ConsumerState::Closed);
            }
            .instrument(span),
        );

        Ok(handle)
    }

    fn ensure_open(&self) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::Acquire) {
            Err(ConnectionError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<B: BrokerConnection> TelepathApi for MisakaNetwork<B> {
    async fn create_telepath(
        &self,
        name: &str,
        config: &TelepathConfig,
    ) -> Result<(), TelepathError> {
        let telepath = TelepathName::new(name)?;
        config.validate()?;
        let spec = StreamSpec::for_telepath(&telepath, config);

        let _link = self.link.read().await;
        self.ensure_open()?;

        match self.broker.create_stream(&spec).await {
            Ok(StreamStatus::Created) => {
                info!(
                    telepath = telepath.as_str(),
                    stream = spec.name.as_str(),
                    ttl_secs = spec.max_age.as_secs(),
                    max_messages = spec.max_messages,
                    max_bytes = spec.max_bytes,
                    "Telepath created"
                );
                Ok(())
            }
            Ok(StreamStatus::AlreadyExists) => {
                debug!(telepath = telepath.as_str(), "Telepath already exists");
                Ok(())
            }
            Err(BrokerError::ConnectionClosed) => Err(ConnectionError::Closed.into()),
            Err(BrokerError::StreamConfigMismatch { .. }) => {
                warn!(
                    telepath = telepath.as_str(),
                    "Telepath exists with a different configuration"
                );
                Err(StreamConfigError::AlreadyExistsWithDifferentConfig {
                    telepath: telepath.to_string(),
                }
                .into())
            }
            Err(source) => Err(StreamConfigError::Broker {
                stream: spec.name,
                source,
            }
            .into()),
        }
    }

    async fn emit_signal(&self, name: &str, signal: &MisakaSignal) -> Result<u64, TelepathError> {
        let telepath = TelepathName::new(name)?;
        let authority = u32::try_from(signal.authority)
            .map_err(|_| TelepathError::InvalidAuthority(signal.authority))?;
        let subject = resolve_publish_subject(&telepath, authority);
        let payload = encode_signal(signal);

        let _link = self.link.read().await;
        self.ensure_open()?;

        match self.broker.publish(&subject, payload).await {
            Ok(ack) => {
                self.metrics.signal_emitted(telepath.as_str());
                debug!(
                    telepath = telepath.as_str(),
                    subject = subject.as_str(),
                    sequence = ack.sequence,
                    uuid = signal.uuid.as_str(),
                    "Signal emitted"
                );
                Ok(ack.sequence)
            }
            Err(BrokerError::ConnectionClosed) => Err(ConnectionError::Closed.into()),
            Err(source) => {
                self.metrics.publish_failed(telepath.as_str());
                warn!(
                    telepath = telepath.as_str(),
                    subject = subject.as_str(),
                    error = %source,
                    "Publish rejected"
                );
                Err(PublishError::Rejected { subject, source }.into())
            }
        }
    }

    async fn subscribe_telepath<H>(
        &self,
        name: &str,
        handler: H,
        ack_policy: AckPolicy,
    ) -> Result<SubscriptionHandle, TelepathError>
    where
        H: SignalHandler,
    {
        let options = self.subscribe_options;
        self.subscribe_telepath_with(name, handler, ack_policy, options)
            .await
    }

    async fn close(&self) -> Result<(), TelepathError> {
        let _link = self.link.write().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // Delivery loops finish their current message and stop.
        self.close_signal.send_replace(true);

        self.broker.close().await.map_err(|err| {
            warn!(error = %err, "Broker connection did not close cleanly");
            ConnectionError::Close(err.to_string())
        })?;

        info!("Connection closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(feature = "nats")]
impl MisakaNetwork<crate::adapters::nats::NatsBroker> {
    /// Connect to the NATS server in `config.broker_url`.
    pub async fn connect(config: &NetworkConfig) -> Result<Self, TelepathError> {
        let broker = crate::adapters::nats::NatsBroker::connect(&config.broker_url).await?;
        Ok(Self::with_config(broker, config))
    }
}
