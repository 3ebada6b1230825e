//! Prometheus metrics for Misaka Network clients.
//!
//! All metrics follow the naming convention: `misaka_<metric>_total`, labelled
//! by `telepath`.
//!
//! Per-message failures never reach callers of `subscribe_telepath`; these
//! counters (and the logs) are where they surface.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Metrics registry for the client
    pub static ref REGISTRY: Registry = Registry::new();

    /// Signals accepted by the broker
    pub static ref SIGNALS_EMITTED: IntCounterVec = IntCounterVec::new(
        Opts::new("misaka_signals_emitted_total", "Signals published and acknowledged by the broker"),
        &["telepath"]
    ).expect("metric creation failed");

    /// Publish attempts the broker rejected
    pub static ref PUBLISH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("misaka_publish_failures_total", "Publish attempts rejected by the broker"),
        &["telepath"]
    ).expect("metric creation failed");

    /// Messages pushed to a subscription, before decoding
    pub static ref SIGNALS_DELIVERED: IntCounterVec = IntCounterVec::new(
        Opts::new("misaka_signals_delivered_total", "Messages delivered to subscriptions"),
        &["telepath"]
    ).expect("metric creation failed");

    /// Acknowledgments sent after successful handling
    pub static ref SIGNALS_ACKNOWLEDGED: IntCounterVec = IntCounterVec::new(
        Opts::new("misaka_signals_acknowledged_total", "Messages acknowledged after handling"),
        &["telepath"]
    ).expect("metric creation failed");

    /// Inbound payloads that failed to decode
    pub static ref DECODE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("misaka_decode_failures_total", "Inbound payloads that were not valid signals"),
        &["telepath"]
    ).expect("metric creation failed");

    /// Handler invocations that failed or panicked
    pub static ref HANDLER_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("misaka_handler_failures_total", "Handler invocations that failed"),
        &["telepath"]
    ).expect("metric creation failed");

    /// Acknowledgments the broker did not accept
    pub static ref ACK_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("misaka_ack_failures_total", "Acknowledgments that could not be sent"),
        &["telepath"]
    ).expect("metric creation failed");
}

/// Register all metrics with [`REGISTRY`].
///
/// Safe to call more than once; metrics already registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SIGNALS_EMITTED.clone()),
        Box::new(PUBLISH_FAILURES.clone()),
        Box::new(SIGNALS_DELIVERED.clone()),
        Box::new(SIGNALS_ACKNOWLEDGED.clone()),
        Box::new(DECODE_FAILURES.clone()),
        Box::new(HANDLER_FAILURES.clone()),
        Box::new(ACK_FAILURES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Sink for client-side delivery metrics.
pub trait MetricsRecorder: Send + Sync {
    /// A signal was accepted by the broker
    fn signal_emitted(&self, telepath: &str);

    /// A publish was rejected
    fn publish_failed(&self, telepath: &str);

    /// A message was delivered to a subscription
    fn signal_delivered(&self, telepath: &str);

    /// A message was acknowledged
    fn signal_acknowledged(&self, telepath: &str);

    /// An inbound payload failed to decode
    fn decode_failed(&self, telepath: &str);

    /// A handler failed or panicked
    fn handler_failed(&self, telepath: &str);

    /// An acknowledgment could not be sent
    fn ack_failed(&self, telepath: &str);
}

/// No-op metrics recorder for when metrics are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn signal_emitted(&self, _: &str) {}
    fn publish_failed(&self, _: &str) {}
    fn signal_delivered(&self, _: &str) {}
    fn signal_acknowledged(&self, _: &str) {}
    fn decode_failed(&self, _: &str) {}
    fn handler_failed(&self, _: &str) {}
    fn ack_failed(&self, _: &str) {}
}

/// Recorder backed by the global Prometheus counters.
#[derive(Debug, Clone, Copy)]
pub struct PrometheusMetrics {
    _private: (),
}

impl PrometheusMetrics {
    /// Register the counters and return a recorder for them.
    pub fn new() -> Result<Self, TelemetryError> {
        register_metrics()?;
        Ok(Self { _private: () })
    }
}

impl MetricsRecorder for PrometheusMetrics {
    fn signal_emitted(&self, telepath: &str) {
        SIGNALS_EMITTED.with_label_values(&[telepath]).inc();
    }

    fn publish_failed(&self, telepath: &str) {
        PUBLISH_FAILURES.with_label_values(&[telepath]).inc();
    }

    fn signal_delivered(&self, telepath: &str) {
        SIGNALS_DELIVERED.with_label_values(&[telepath]).inc();
    }

    fn signal_acknowledged(&self, telepath: &str) {
        SIGNALS_ACKNOWLEDGED.with_label_values(&[telepath]).inc();
    }

    fn decode_failed(&self, telepath: &str) {
        DECODE_FAILURES.with_label_values(&[telepath]).inc();
    }

    fn handler_failed(&self, telepath: &str) {
        HANDLER_FAILURES.with_label_values(&[telepath]).inc();
    }

    fn ack_failed(&self, telepath: &str) {
        ACK_FAILURES.with_label_values(&[telepath]).inc();
    }
}
