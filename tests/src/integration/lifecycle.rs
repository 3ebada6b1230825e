//! # Connection Lifecycle
//!
//! Close is idempotent and stops delivery. Durable consumers outlive the
//! connection: a new client resumes at the first unacknowledged message.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use misaka_network::{
        AckPolicy, ConnectionError, ConsumerState, HandlerError, InMemoryServer, MisakaNetwork,
        SubscriptionError, TelepathApi, TelepathConfig, TelepathError,
    };
    use misaka_signal::MisakaSignal;
    use misaka_telemetry::metrics::{gather_metrics, PrometheusMetrics};
    use tokio::sync::mpsc;

    use crate::fixtures::{
        collect, eventually, fast_redelivery, next_signal, recording_handler, text_signal,
        within_wait, FAST_ACK_WAIT,
    };

    fn is_closed_error(err: &TelepathError) -> bool {
        matches!(err, TelepathError::Connection(ConnectionError::Closed))
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());
        network
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();
        let (handler, _rx) = recording_handler();
        let handle = network
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap();

        network.close().await.unwrap();
        network.close().await.unwrap();
        assert!(network.is_closed());

        within_wait(handle.closed()).await;
        assert_eq!(handle.state(), ConsumerState::Closed);

        let err = network
            .create_telepath("t2", &TelepathConfig::default())
            .await
            .unwrap_err();
        assert!(is_closed_error(&err));

        let err = network
            .emit_signal("t1", &text_signal("late", 0))
            .await
            .unwrap_err();
        assert!(is_closed_error(&err));

        let (handler, _rx) = recording_handler();
        let err = network
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap_err();
        assert!(is_closed_error(&err));
    }

    #[tokio::test]
    async fn test_no_callbacks_after_close() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());
        network
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();
        let (handler, mut rx) = recording_handler();
        let handle = network
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap();
        network.close().await.unwrap();
        within_wait(handle.closed()).await;

        let publisher = MisakaNetwork::new(server.connect());
        publisher
            .emit_signal("t1", &text_signal("after-close", 0))
            .await
            .unwrap();

        assert!(next_signal(&mut rx, FAST_ACK_WAIT * 2).await.is_none());
    }

    #[tokio::test]
    async fn test_restarted_subscriber_resumes() {
        let server = InMemoryServer::new();
        let publisher = MisakaNetwork::new(server.connect());
        publisher
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();
        for content in ["m1", "m2"] {
            publisher
                .emit_signal("t1", &text_signal(content, 0))
                .await
                .unwrap();
        }

        let first = MisakaNetwork::new(server.connect());
        let (handler, mut rx) = recording_handler();
        let handle = first
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap();
        assert_eq!(collect(&mut rx, 2).await, vec!["m1", "m2"]);
        assert!(eventually(|| handle.stats().acknowledged == 2).await);
        first.close().await.unwrap();

        publisher
            .emit_signal("t1", &text_signal("m3", 0))
            .await
            .unwrap();

        let second = MisakaNetwork::new(server.connect());
        let (handler, mut rx) = recording_handler();
        second
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap();
        assert_eq!(collect(&mut rx, 1).await, vec!["m3"]);
        assert!(next_signal(&mut rx, FAST_ACK_WAIT * 2).await.is_none());
    }

    #[tokio::test]
    async fn test_unacked_message_survives_restart() {
        let server = InMemoryServer::new();
        let first = MisakaNetwork::new(server.connect());
        first
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();
        first
            .emit_signal("t1", &text_signal("m1", 0))
            .await
            .unwrap();

        let (attempt_tx, mut attempt_rx) = mpsc::unbounded_channel();
        let failing = move |_signal: MisakaSignal| {
            let _ = attempt_tx.send(());
            async { Err::<(), _>(HandlerError::new("not ready")) }
        };
        first
            .subscribe_telepath("t1", failing, AckPolicy::Explicit)
            .await
            .unwrap();
        within_wait(attempt_rx.recv()).await.unwrap();
        first.close().await.unwrap();

        let second = MisakaNetwork::new(server.connect());
        let (delivered_tx, mut delivered_rx) = mpsc::unbounded_channel();
        let handler = move |signal: MisakaSignal| {
            let _ = delivered_tx.send(signal);
            async { Ok::<(), HandlerError>(()) }
        };
        second
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap();

        let signal = within_wait(delivered_rx.recv()).await.unwrap();
        assert_eq!(signal.payload, b"m1".to_vec());
        let info = server.consumer_info("telepath_t1", "t1_consumer").unwrap();
        assert!(info.num_redelivered >= 1);
    }

    #[tokio::test]
    async fn test_one_delivery_loop_per_telepath_per_client() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());
        network
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();

        let (handler, _rx) = recording_handler();
        network
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap();
        let (handler, _rx) = recording_handler();
        let err = network
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TelepathError::Subscription(SubscriptionError::AlreadySubscribed { .. })
        ));

        // A second process role would use its own connection; the durable
        // consumer is still bound here.
        let other = MisakaNetwork::new(server.connect());
        let (handler, _rx) = recording_handler();
        assert!(other
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_metrics_record_delivery_outcomes() {
        let server = InMemoryServer::new();
        let metrics = Arc::new(PrometheusMetrics::new().unwrap());
        let network = MisakaNetwork::new(server.connect())
            .with_metrics(metrics)
            .with_subscribe_options(fast_redelivery());
        network
            .create_telepath("metered", &TelepathConfig::default())
            .await
            .unwrap();

        let (handler, mut rx) = recording_handler();
        let handle = network
            .subscribe_telepath("metered", handler, AckPolicy::Explicit)
            .await
            .unwrap();
        network
            .emit_signal("metered", &text_signal("m1", 0))
            .await
            .unwrap();
        assert_eq!(collect(&mut rx, 1).await, vec!["m1"]);
        assert!(eventually(|| handle.stats().acknowledged == 1).await);

        let text = gather_metrics().unwrap();
        assert!(text.contains("misaka_signals_emitted_total{telepath=\"metered\"} 1"));
        assert!(text.contains("misaka_signals_acknowledged_total{telepath=\"metered\"} 1"));
    }
}
