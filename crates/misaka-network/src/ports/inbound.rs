//! Inbound Ports (Driving Ports)
//!
//! The telepath client API and the handler contract for subscribers.

use std::future::Future;

use async_trait::async_trait;
use misaka_signal::MisakaSignal;

use crate::domain::{AckPolicy, TelepathConfig};
use crate::error::{HandlerError, TelepathError};
use crate::service::SubscriptionHandle;

/// Receives decoded signals of one subscription, one at a time and in
/// delivery order.
///
/// Returning `Err` leaves the message unacknowledged so the broker
/// redelivers it. Panics are treated the same way.
#[async_trait]
pub trait SignalHandler: Send + 'static {
    async fn handle(&mut self, signal: MisakaSignal) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> SignalHandler for F
where
    F: FnMut(MisakaSignal) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&mut self, signal: MisakaSignal) -> Result<(), HandlerError> {
        (self)(signal).await
    }
}

/// Telepath client API (Driving Port)
#[async_trait]
pub trait TelepathApi: Send + Sync {
    /// Provision the bounded stream behind a telepath. Idempotent for
    /// identical configuration.
    async fn create_telepath(&self, name: &str, config: &TelepathConfig)
        -> Result<(), TelepathError>;

    /// Publish a signal into its authority partition. Returns the broker's
    /// per-stream sequence number.
    async fn emit_signal(&self, name: &str, signal: &MisakaSignal) -> Result<u64, TelepathError>;

    /// Install a durable consumer and start delivering to `handler`.
    async fn subscribe_telepath<H>(
        &self,
        name: &str,
        handler: H,
        ack_policy: AckPolicy,
    ) -> Result<SubscriptionHandle, TelepathError>
    where
        H: SignalHandler;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&self) -> Result<(), TelepathError>;

    fn is_closed(&self) -> bool;
}
