//! # Misaka Network - Telepath Pub/Sub Client
//!
//! Agents exchange `MisakaSignal`s over telepaths. A telepath is a named,
//! bounded broker stream; signals are partitioned inside it by their
//! authority level, and subscribers consume through a durable consumer that
//! survives reconnects.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): naming, retention limits, subject routing,
//!   ack decision, consumer lifecycle. No I/O.
//! - **Ports Layer** (`ports/`): `TelepathApi` and `SignalHandler` (driving),
//!   `BrokerConnection` (driven).
//! - **Service Layer** (`service/`): `MisakaNetwork` and the per-subscription
//!   `DeliveryDispatcher`.
//! - **Adapters Layer** (`adapters/`): in-memory broker, NATS JetStream
//!   (feature `nats`).
//!
//! ## Flow
//!
//! ```text
//!  create_telepath()          emit_signal()                subscribe_telepath()
//!        │                         │                                │
//!        ▼                         ▼                                ▼
//! ┌──────────────┐  ┌─────────────────────────────┐  ┌──────────────────────────┐
//! │ StreamSpec   │  │ telepath_<name>.lv<level>   │  │ durable <name>_consumer  │
//! │ telepath_<n> │  │ encode → publish → sequence │  │ on telepath_<name>.>     │
//! └──────┬───────┘  └──────────────┬──────────────┘  └────────────┬─────────────┘
//!        │                         │                              │ feed
//!        ▼                         ▼                              ▼
//! ┌──────────────────────────────────────────┐      ┌──────────────────────────┐
//! │              BrokerConnection            │ ───▶ │ DeliveryDispatcher task  │
//! └──────────────────────────────────────────┘      │ decode → handler → ack   │
//!                                                   └──────────────────────────┘
//! ```
//!
//! ## Delivery guarantees
//!
//! - At-least-once. Handler errors and panics withhold the ack and the
//!   broker redelivers.
//! - One message at a time per subscription, in delivery order.
//! - Undecodable payloads never reach the handler and never stop the loop.
//!
//! ## Usage Example
//!
//! ```ignore
//! use misaka_network::{AckPolicy, InMemoryServer, MisakaNetwork, TelepathApi, TelepathConfig};
//! use misaka_signal::SignalBuilder;
//!
//! let server = InMemoryServer::new();
//! let network = MisakaNetwork::new(server.connect());
//!
//! network.create_telepath("demo", &TelepathConfig::default()).await?;
//! network
//!     .subscribe_telepath("demo", |signal| async move {
//!         println!("{}", signal.sender_agent);
//!         Ok(())
//!     }, AckPolicy::Explicit)
//!     .await?;
//!
//! let signal = SignalBuilder::new("agent-1").authority_value(3).build();
//! let sequence = network.emit_signal("demo", &signal).await?;
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::memory::{ConsumerInfo, InMemoryBroker, InMemoryServer, StreamInfo};
#[cfg(feature = "nats")]
pub use adapters::nats::NatsBroker;
pub use config::{ConfigError, NetworkConfig};
pub use domain::{
    resolve_publish_subject, resolve_subscribe_pattern, AckPolicy, ConsumerState,
    SubscribeOptions, TelepathConfig, TelepathName,
};
pub use error::{
    BrokerError, ConnectionError, DecodeError, HandlerError, PublishError, StreamConfigError,
    SubscriptionError, TelepathError,
};
pub use ports::{BrokerConnection, SignalHandler, TelepathApi};
pub use service::{DeliveryStatsSnapshot, MisakaNetwork, SubscriptionHandle};

pub use misaka_signal::MisakaSignal;
