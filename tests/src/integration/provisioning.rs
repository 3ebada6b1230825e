//! # Telepath Provisioning
//!
//! Stream creation is idempotent for identical configuration and rejects a
//! differing one. Emit returns strictly increasing per-stream sequences.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use misaka_network::{
        AckPolicy, InMemoryServer, MisakaNetwork, StreamConfigError, TelepathApi, TelepathConfig,
        TelepathError,
    };

    use crate::fixtures::{collect, recording_handler, text_signal};

    #[tokio::test]
    async fn test_create_twice_leaves_stream_untouched() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());
        let config = TelepathConfig::builder()
            .ttl_secs(300)
            .max_messages(10_000)
            .build()
            .unwrap();

        network.create_telepath("t1", &config).await.unwrap();
        network.emit_signal("t1", &text_signal("m1", 0)).await.unwrap();
        let before = server.stream_info("telepath_t1").unwrap();

        network.create_telepath("t1", &config).await.unwrap();
        let after = server.stream_info("telepath_t1").unwrap();

        assert_eq!(before, after);
        assert_eq!(after.messages, 1);
    }

    #[tokio::test]
    async fn test_create_with_different_config_is_rejected() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());

        network
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();

        let shorter_ttl = TelepathConfig::builder().ttl_secs(10).build().unwrap();
        let err = network.create_telepath("t1", &shorter_ttl).await.unwrap_err();

        assert!(matches!(
            err,
            TelepathError::StreamConfig(StreamConfigError::AlreadyExistsWithDifferentConfig {
                ref telepath
            }) if telepath == "t1"
        ));
    }

    #[tokio::test]
    async fn test_idempotent_across_connections() {
        let server = InMemoryServer::new();
        let first = MisakaNetwork::new(server.connect());
        let second = MisakaNetwork::new(server.connect());

        first
            .create_telepath("shared", &TelepathConfig::default())
            .await
            .unwrap();
        second
            .create_telepath("shared", &TelepathConfig::default())
            .await
            .unwrap();

        assert_eq!(server.stream_names(), vec!["telepath_shared".to_string()]);
    }

    #[tokio::test]
    async fn test_sequences_strictly_increase() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());
        network
            .create_telepath("t1", &TelepathConfig::default())
            .await
            .unwrap();

        let mut sequences = Vec::new();
        for (i, authority) in [0, 1, 5, 0, 2, 5].into_iter().enumerate() {
            let signal = text_signal(&format!("m{i}"), authority);
            sequences.push(network.emit_signal("t1", &signal).await.unwrap());
        }

        assert!(sequences.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_sequences_are_per_telepath() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());
        for name in ["a", "b"] {
            network
                .create_telepath(name, &TelepathConfig::default())
                .await
                .unwrap();
        }

        assert_eq!(network.emit_signal("a", &text_signal("x", 0)).await.unwrap(), 1);
        assert_eq!(network.emit_signal("a", &text_signal("x", 0)).await.unwrap(), 2);
        assert_eq!(network.emit_signal("b", &text_signal("x", 0)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_cap_drops_oldest() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());
        let config = TelepathConfig::builder().max_messages(2).build().unwrap();
        network.create_telepath("capped", &config).await.unwrap();

        for content in ["m1", "m2", "m3"] {
            network
                .emit_signal("capped", &text_signal(content, 0))
                .await
                .unwrap();
        }

        let (handler, mut rx) = recording_handler();
        network
            .subscribe_telepath("capped", handler, AckPolicy::Explicit)
            .await
            .unwrap();

        assert_eq!(collect(&mut rx, 2).await, vec!["m2", "m3"]);
    }

    #[tokio::test]
    async fn test_expired_messages_are_not_delivered() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());
        let config = TelepathConfig::builder()
            .ttl(Duration::from_millis(300))
            .build()
            .unwrap();
        network.create_telepath("short", &config).await.unwrap();
        network
            .emit_signal("short", &text_signal("stale", 0))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;
        network
            .emit_signal("short", &text_signal("fresh", 0))
            .await
            .unwrap();

        let (handler, mut rx) = recording_handler();
        network
            .subscribe_telepath("short", handler, AckPolicy::Explicit)
            .await
            .unwrap();

        assert_eq!(collect(&mut rx, 1).await, vec!["fresh"]);
    }

    #[tokio::test]
    async fn test_invalid_names_and_limits() {
        let server = InMemoryServer::new();
        let network = MisakaNetwork::new(server.connect());

        for name in ["", "has.dot", "wild*", "tail>"] {
            let err = network
                .create_telepath(name, &TelepathConfig::default())
                .await
                .unwrap_err();
            assert!(matches!(err, TelepathError::InvalidTelepathName { .. }));
        }

        let negative = TelepathConfig {
            max_messages: -10,
            ..TelepathConfig::default()
        };
        let err = network.create_telepath("ok", &negative).await.unwrap_err();
        assert!(matches!(
            err,
            TelepathError::StreamConfig(StreamConfigError::InvalidLimit { .. })
        ));
        assert!(server.stream_names().is_empty());
    }
}
