//! # Acknowledgment Policies
//!
//! - EXPLICIT: each handled message is acked on its own
//! - ALL: an ack covers every earlier message of the consumer
//! - NONE: nothing is acked and nothing is redelivered

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use misaka_network::{
        AckPolicy, HandlerError, InMemoryServer, MisakaNetwork, SubscribeOptions, TelepathApi,
        TelepathConfig,
    };
    use misaka_signal::MisakaSignal;
    use tokio::sync::mpsc;

    use crate::fixtures::{
        collect, content_of, eventually, fast_redelivery, next_signal, recording_handler,
        text_signal, FAST_ACK_WAIT, WAIT,
    };

    #[tokio::test]
    async fn test_explicit_leaves_nothing_pending() {
        let server = InMemoryServer::new();
        let network =
            MisakaNetwork::new(server.connect()).with_subscribe_options(fast_redelivery());
        network
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();

        let (handler, mut rx) = recording_handler();
        let handle = network
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap();
        assert_eq!(handle.ack_policy(), AckPolicy::Explicit);

        network.emit_signal("t1", &text_signal("m1", 0)).await.unwrap();
        assert_eq!(collect(&mut rx, 1).await, vec!["m1"]);
        assert!(eventually(|| {
            server
                .consumer_info("telepath_t1", "t1_consumer")
                .is_some_and(|info| info.num_ack_pending == 0)
        })
        .await);
    }

    #[tokio::test]
    async fn test_all_ack_covers_earlier_failure() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect()).with_subscribe_options(
            SubscribeOptions {
                ack_wait: Duration::from_secs(30),
                max_ack_pending: 10,
                max_deliver: None,
            },
        );
        network
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();
        for content in ["m1", "m2", "m3"] {
            network
                .emit_signal("t1", &text_signal(content, 0))
                .await
                .unwrap();
        }

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let handler = move |signal: MisakaSignal| {
            let content = content_of(&signal);
            let _ = seen_tx.send(content.clone());
            async move {
                if content == "m1" {
                    Err(HandlerError::new("m1 fails"))
                } else {
                    Ok(())
                }
            }
        };
        let handle = network
            .subscribe_telepath("t1", handler, AckPolicy::All)
            .await
            .unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(
                tokio::time::timeout(WAIT, seen_rx.recv())
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        assert_eq!(seen, vec!["m1", "m2", "m3"]);

        // The ack of m2 also settled the failed m1.
        assert!(eventually(|| {
            server
                .consumer_info("telepath_t1", "t1_consumer")
                .is_some_and(|info| info.num_ack_pending == 0)
        })
        .await);
        assert!(eventually(|| handle.stats().acknowledged == 2).await);
        assert_eq!(handle.stats().handler_failures, 1);
    }

    #[tokio::test]
    async fn test_none_never_acks_or_redelivers() {
        let server = InMemoryServer::new();
        let network =
            MisakaNetwork::new(server.connect()).with_subscribe_options(fast_redelivery());
        network
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let handler = move |signal: MisakaSignal| {
            let _ = seen_tx.send(content_of(&signal));
            async { Err::<(), _>(HandlerError::new("always fails")) }
        };
        let handle = network
            .subscribe_telepath("t1", handler, AckPolicy::None)
            .await
            .unwrap();

        for content in ["m1", "m2", "m3"] {
            network
                .emit_signal("t1", &text_signal(content, 0))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(
                tokio::time::timeout(WAIT, seen_rx.recv())
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        assert_eq!(seen, vec!["m1", "m2", "m3"]);

        tokio::time::sleep(FAST_ACK_WAIT * 4).await;
        assert!(seen_rx.try_recv().is_err());
        assert_eq!(handle.stats().acknowledged, 0);

        let info = server.consumer_info("telepath_t1", "t1_consumer").unwrap();
        assert_eq!(info.num_ack_pending, 0);
        assert_eq!(info.ack_policy, AckPolicy::None);
    }

    #[tokio::test]
    async fn test_policy_is_fixed_for_a_durable_consumer() {
        let server = InMemoryServer::new();
        let first = MisakaNetwork::new(server.connect());
        first
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();
        let (handler, _rx) = recording_handler();
        first
            .subscribe_telepath("t1", handler, AckPolicy::Explicit)
            .await
            .unwrap();
        first.close().await.unwrap();

        let second = MisakaNetwork::new(server.connect());
        let (handler, mut rx) = recording_handler();
        let err = second
            .subscribe_telepath("t1", handler, AckPolicy::All)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            misaka_network::TelepathError::Subscription(
                misaka_network::SubscriptionError::Broker { .. }
            )
        ));
        assert!(next_signal(&mut rx, FAST_ACK_WAIT).await.is_none());
    }
}
