//! Ports Layer - Hexagonal Architecture Interfaces
//!
//! Inbound ports are what callers drive: the telepath client API and the
//! signal handler callers install. Outbound ports are what the client needs
//! from a broker.

pub mod inbound;
pub mod outbound;

pub use inbound::{SignalHandler, TelepathApi};
pub use outbound::{
    Acknowledger, BrokerConnection, DeliveryInfo, InboundMessage, MessageFeed, PublishAck,
    StreamStatus,
};
