//! # Send Flow
//!
//! `POST /send` → validation → identity recall → bounded queue →
//! dispatcher → transport.

#[cfg(test)]
mod tests {
    use crate::harness::TestBridge;
    use mb_01_lifecycle::{AnnounceOutcome, LifecycleConfig};
    use serde_json::{json, Value};
    use shared_types::Address;
    use std::time::Duration;

    async fn post_send(bridge: &TestBridge, body: Value) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(bridge.url("/send"))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn get_status(bridge: &TestBridge) -> Value {
        reqwest::get(bridge.url("/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    #[tokio::test]
    async fn test_wrong_length_destination_is_rejected() {
        let bridge = TestBridge::start().await;

        let (status, body) =
            post_send(&bridge, json!({"destination": "abcd", "message": "hi"})).await;

        assert_eq!(status, 400);
        assert!(body["detail"].as_str().unwrap().contains("length"));
        assert_eq!(get_status(&bridge).await["queue_depth"], 0);
        assert!(bridge.transport.path_requests().is_empty());
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_non_hex_destination_is_rejected() {
        let bridge = TestBridge::start().await;

        let (status, body) = post_send(
            &bridge,
            json!({"destination": "zz".repeat(16), "message": "hi"}),
        )
        .await;

        assert_eq!(status, 400);
        assert!(body["detail"].is_string());
        assert_eq!(bridge.service.status().queue_depth, 0);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_field_is_rejected() {
        let bridge = TestBridge::start().await;

        let (status, _) = post_send(&bridge, json!({"destination": "00".repeat(16)})).await;

        assert_eq!(status, 400);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_identity_requests_path_and_rejects() {
        let bridge = TestBridge::start().await;
        let unknown = Address::from_bytes([0x42; 16]);

        let (status, body) = post_send(
            &bridge,
            json!({"destination": unknown.to_hex(), "message": "hi"}),
        )
        .await;

        assert_eq!(status, 400);
        assert!(body["detail"].as_str().unwrap().contains("path"));
        assert_eq!(bridge.transport.path_requests(), vec![unknown]);
        assert_eq!(bridge.service.status().queue_depth, 0);
        bridge.shutdown().await;
    }

    // =========================================================================
    // QUEUE AND DISPATCH
    // =========================================================================

    #[tokio::test]
    async fn test_queued_message_reaches_transport() {
        let bridge = TestBridge::start().await;
        let peer = bridge.known_peer(0x10);

        let (status, body) = post_send(
            &bridge,
            json!({"destination": peer.to_hex(), "message": "hello mesh"}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "message queued");
        assert_eq!(get_status(&bridge).await["queue_depth"], 1);

        let report = bridge.tick().await;
        assert!(report.dispatched);
        assert!(matches!(report.announce, Some(AnnounceOutcome::Announced { .. })));

        let sent = bridge.transport.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination(), &peer);
        assert_eq!(sent[0].payload(), b"hello mesh");
        assert_eq!(sent[0].title(), "Reply");
        assert_eq!(bridge.service.status().queue_depth, 0);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_custom_title_is_kept() {
        let bridge = TestBridge::start().await;
        let peer = bridge.known_peer(0x11);

        let (status, _) = post_send(
            &bridge,
            json!({"destination": peer.to_hex(), "message": "m", "title": "Alert"}),
        )
        .await;
        assert_eq!(status, 200);

        bridge.tick().await;
        assert_eq!(bridge.transport.sent_messages()[0].title(), "Alert");
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_dispatch_is_one_message_per_tick_in_order() {
        let bridge = TestBridge::start().await;
        let peer = bridge.known_peer(0x12);

        for i in 0..3 {
            let (status, _) = post_send(
                &bridge,
                json!({"destination": peer.to_hex(), "message": format!("m{}", i)}),
            )
            .await;
            assert_eq!(status, 200);
        }

        for expected_depth in [2, 1, 0] {
            assert!(bridge.tick().await.dispatched);
            assert_eq!(bridge.service.status().queue_depth, expected_depth);
        }

        let payloads: Vec<Vec<u8>> = bridge
            .transport
            .sent_messages()
            .iter()
            .map(|m| m.payload().to_vec())
            .collect();
        assert_eq!(payloads, vec![b"m0".to_vec(), b"m1".to_vec(), b"m2".to_vec()]);
        assert!(!bridge.tick().await.dispatched);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_sixth_send_waits_for_dispatcher() {
        let bridge = TestBridge::start().await;
        let peer = bridge.known_peer(0x13);

        for _ in 0..5 {
            let (status, _) =
                post_send(&bridge, json!({"destination": peer.to_hex(), "message": "x"})).await;
            assert_eq!(status, 200);
        }
        assert_eq!(bridge.service.status().queue_depth, 5);

        let url = bridge.url("/send");
        let body = json!({"destination": peer.to_hex(), "message": "sixth"});
        let pending = tokio::spawn(async move {
            reqwest::Client::new()
                .post(url)
                .json(&body)
                .send()
                .await
                .unwrap()
                .status()
                .as_u16()
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!pending.is_finished());

        assert!(bridge.tick().await.dispatched);
        let status = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .expect("blocked send never completed")
            .unwrap();
        assert_eq!(status, 200);
        assert_eq!(bridge.service.status().queue_depth, 5);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_enqueue_timeout_returns_503() {
        let lifecycle = LifecycleConfig {
            queue_capacity: 1,
            enqueue_timeout_secs: Some(1),
            ..LifecycleConfig::default()
        };
        let bridge = TestBridge::start_with(lifecycle).await;
        let peer = bridge.known_peer(0x14);

        let (first, _) =
            post_send(&bridge, json!({"destination": peer.to_hex(), "message": "a"})).await;
        assert_eq!(first, 200);

        let (second, body) =
            post_send(&bridge, json!({"destination": peer.to_hex(), "message": "b"})).await;
        assert_eq!(second, 503);
        assert!(body["detail"].as_str().unwrap().contains("full"));
        assert_eq!(bridge.service.status().queue_depth, 1);
        bridge.shutdown().await;
    }

    // =========================================================================
    // ANNOUNCE THROTTLING
    // =========================================================================

    #[tokio::test]
    async fn test_announce_is_throttled_across_ticks() {
        let bridge = TestBridge::start().await;

        bridge.tick().await;
        bridge.tick().await;
        assert_eq!(bridge.transport.announce_count(), 1);

        bridge.clock.advance(600);
        bridge.tick().await;
        assert_eq!(bridge.transport.announce_count(), 2);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_reports_pretty_local_address() {
        let bridge = TestBridge::start().await;

        let status = get_status(&bridge).await;
        assert_eq!(status["local_address"], format!("<{}>", "aa".repeat(16)));
        assert_eq!(status["queue_capacity"], 5);
        assert_eq!(status["dedup_set_size"], 0);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_local_hash_round_trips_into_send() {
        let bridge = TestBridge::start().await;
        bridge.known_peer(0xaa);

        let status = get_status(&bridge).await;
        assert_eq!(status["local_hash"], "aa".repeat(16));

        let (code, _) = post_send(
            &bridge,
            json!({"destination": status["local_address"], "message": "bracketed"}),
        )
        .await;
        assert_eq!(code, 400);

        let (code, _) = post_send(
            &bridge,
            json!({"destination": status["local_hash"], "message": "plain"}),
        )
        .await;
        assert_eq!(code, 200);
        assert_eq!(bridge.service.status().queue_depth, 1);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_announce_uses_configured_display_name() {
        let bridge = TestBridge::start_with(LifecycleConfig {
            display_name: "Harbour Relay".into(),
            ..Default::default()
        })
        .await;

        bridge.tick().await;
        assert_eq!(
            bridge.transport.last_announced_name().as_deref(),
            Some("Harbour Relay")
        );
        bridge.shutdown().await;
    }
}
