//! Delivery Dispatcher
//!
//! Drives one subscription: decode, invoke the handler, then apply the ack
//! policy. Messages are processed strictly one at a time in feed order.
//! Decode failures, handler errors and handler panics are contained here and
//! never end the loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use misaka_signal::decode_signal;
use misaka_telemetry::metrics::MetricsRecorder;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::subscription::DeliveryStats;
use crate::domain::{
    ack_action, parse_authority, AckAction, AckPolicy, HandlingOutcome, SubscribeOptions,
    TelepathName,
};
use crate::ports::{InboundMessage, MessageFeed, SignalHandler};

/// Final result of dispatching one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handled and acknowledged.
    Acknowledged,
    /// Handled, no ack under this policy.
    Handled,
    /// Payload did not decode. Left unacknowledged.
    DecodeFailed,
    /// Handler failed or panicked. Left unacknowledged.
    HandlerFailed,
    /// Handled, but the broker refused the ack.
    AckFailed,
}

pub struct DeliveryDispatcher<H> {
    telepath: TelepathName,
    ack_policy: AckPolicy,
    handler: H,
    max_deliver: Option<u32>,
    metrics: Arc<dyn MetricsRecorder>,
    stats: Arc<DeliveryStats>,
}

impl<H: SignalHandler> DeliveryDispatcher<H> {
    pub fn new(
        telepath: TelepathName,
        ack_policy: AckPolicy,
        handler: H,
        metrics: Arc<dyn MetricsRecorder>,
        stats: Arc<DeliveryStats>,
    ) -> Self {
        Self {
            telepath,
            ack_policy,
            handler,
            max_deliver: SubscribeOptions::default().max_deliver,
            metrics,
            stats,
        }
    }

    /// Delivery attempts the consumer allows. `None` means unlimited.
    #[must_use]
    pub fn with_max_deliver(mut self, max_deliver: Option<u32>) -> Self {
        self.max_deliver = max_deliver;
        self
    }

    /// Dispatch a single message.
    pub async fn dispatch(&mut self, message: &InboundMessage) -> DispatchOutcome {
        let telepath = self.telepath.as_str();
        let info = message.info();

        self.stats.record_delivery();
        self.metrics.signal_delivered(telepath);
        debug!(
            telepath,
            subject = message.subject(),
            sequence = info.stream_sequence,
            delivered = info.delivered,
            authority = parse_authority(message.subject()),
            "Delivering signal"
        );

        let outcome = match decode_signal(message.payload()) {
            Err(err) => {
                warn!(
                    telepath,
                    subject = message.subject(),
                    sequence = info.stream_sequence,
                    error = %err,
                    "Undecodable signal skipped"
                );
                self.metrics.decode_failed(telepath);
                HandlingOutcome::DecodeFailed
            }
            Ok(signal) => {
                let handled = AssertUnwindSafe(self.handler.handle(signal))
                    .catch_unwind()
                    .await;
                match handled {
                    Ok(Ok(())) => HandlingOutcome::Handled,
                    Ok(Err(err)) => {
                        warn!(
                            telepath,
                            sequence = info.stream_sequence,
                            delivered = info.delivered,
                            error = %err,
                            "Signal handler failed, message left for redelivery"
                        );
                        self.metrics.handler_failed(telepath);
                        HandlingOutcome::HandlerFailed
                    }
                    Err(panic) => {
                        error!(
                            telepath,
                            sequence = info.stream_sequence,
                            delivered = info.delivered,
                            panic = %panic_reason(panic.as_ref()),
                            "Signal handler panicked, message left for redelivery"
                        );
                        self.metrics.handler_failed(telepath);
                        HandlingOutcome::HandlerFailed
                    }
                }
            }
        };

        let dispatched = match ack_action(self.ack_policy, outcome) {
            AckAction::Withhold => unacknowledged(outcome),
            // Unlimited redelivery: a nak would redeliver in a tight loop.
            AckAction::Nak if self.max_deliver.is_none() => unacknowledged(outcome),
            AckAction::Nak => {
                if let Err(err) = message.nak().await {
                    warn!(
                        telepath,
                        sequence = info.stream_sequence,
                        error = %err,
                        "Failed to request redelivery, falling back to ack wait"
                    );
                }
                unacknowledged(outcome)
            }
            AckAction::Ack => match message.ack().await {
                Ok(()) => {
                    self.metrics.signal_acknowledged(telepath);
                    DispatchOutcome::Acknowledged
                }
                Err(err) => {
                    warn!(
                        telepath,
                        sequence = info.stream_sequence,
                        error = %err,
                        "Failed to acknowledge signal"
                    );
                    self.metrics.ack_failed(telepath);
                    DispatchOutcome::AckFailed
                }
            },
        };

        self.stats.record_outcome(dispatched);
        dispatched
    }

    /// Process `feed` until it ends or `shutdown` turns true.
    ///
    /// A message already being handled runs to completion first.
    pub async fn run(mut self, mut feed: MessageFeed, mut shutdown: watch::Receiver<bool>) {
        info!(
            telepath = self.telepath.as_str(),
            ack_policy = %self.ack_policy,
            "Delivery loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let message = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                message = feed.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            self.dispatch(&message).await;
        }

        info!(telepath = self.telepath.as_str(), "Delivery loop stopped");
    }
}

fn unacknowledged(outcome: HandlingOutcome) -> DispatchOutcome {
    match outcome {
        HandlingOutcome::Handled => DispatchOutcome::Handled,
        HandlingOutcome::HandlerFailed => DispatchOutcome::HandlerFailed,
        HandlingOutcome::DecodeFailed => DispatchOutcome::DecodeFailed,
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(reason) = panic.downcast_ref::<&str>() {
        (*reason).to_string()
    } else if let Some(reason) = panic.downcast_ref::<String>() {
        reason.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
