//! Shared helpers for the scenario tests.

use std::future::Future;
use std::time::Duration;

use misaka_network::{HandlerError, SignalHandler, SubscribeOptions};
use misaka_signal::{MisakaSignal, SignalBuilder};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

/// Upper bound for anything the tests wait on.
pub const WAIT: Duration = Duration::from_secs(5);

/// Ack wait short enough to see redeliveries quickly.
pub const FAST_ACK_WAIT: Duration = Duration::from_millis(50);

/// One message in flight, quick redelivery, five attempts.
pub fn fast_redelivery() -> SubscribeOptions {
    SubscribeOptions {
        ack_wait: FAST_ACK_WAIT,
        max_ack_pending: 1,
        max_deliver: Some(5),
    }
}

/// A signal whose payload is `content`.
pub fn text_signal(content: &str, authority: u32) -> MisakaSignal {
    SignalBuilder::new("test-agent")
        .authority_value(authority)
        .content_type("text/plain")
        .payload(content.as_bytes().to_vec())
        .build()
}

pub fn content_of(signal: &MisakaSignal) -> String {
    String::from_utf8_lossy(&signal.payload).into_owned()
}

/// Handler that forwards every signal it accepts to the returned receiver.
pub fn recording_handler() -> (impl SignalHandler, mpsc::UnboundedReceiver<MisakaSignal>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |signal: MisakaSignal| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(signal);
            Ok::<(), HandlerError>(())
        }
    };
    (handler, rx)
}

/// Next recorded signal, or `None` if nothing arrives within `within`.
pub async fn next_signal(
    rx: &mut mpsc::UnboundedReceiver<MisakaSignal>,
    within: Duration,
) -> Option<MisakaSignal> {
    timeout(within, rx.recv()).await.ok().flatten()
}

/// Collect exactly `count` signals, failing the test if they do not arrive.
pub async fn collect(rx: &mut mpsc::UnboundedReceiver<MisakaSignal>, count: usize) -> Vec<String> {
    let mut contents = Vec::with_capacity(count);
    for _ in 0..count {
        let signal = next_signal(rx, WAIT)
            .await
            .expect("expected another signal");
        contents.push(content_of(&signal));
    }
    contents
}

/// Poll `condition` until it holds or [`WAIT`] elapses.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Run `future` with the standard test timeout.
pub async fn within_wait<T>(future: impl Future<Output = T>) -> T {
    timeout(WAIT, future).await.expect("timed out")
}
