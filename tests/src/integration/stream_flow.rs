//! # Stream Flow
//!
//! Transport delivery → receipt dedup → bus fan-out → `/ws` clients, plus
//! sends submitted over the stream.

#[cfg(test)]
mod tests {
    use crate::harness::TestBridge;
    use futures::{SinkExt, StreamExt};
    use serde_json::Value;
    use shared_types::{Address, InboundMessage, ReceiptId};
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const SENDER: Address = Address::from_bytes([0x55; 16]);

    async fn connect(bridge: &TestBridge) -> Client {
        let (client, _) = connect_async(bridge.ws_url()).await.unwrap();
        client
    }

    /// Next text frame as JSON, failing after two seconds.
    async fn next_json(client: &mut Client) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
                .await
                .expect("no frame within timeout")
                .expect("stream ended")
                .unwrap();
            match frame {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    }

    /// True if no text frame arrives within `wait`.
    async fn stays_quiet(client: &mut Client, wait: Duration) -> bool {
        match tokio::time::timeout(wait, client.next()).await {
            Err(_) => true,
            Ok(Some(Ok(Message::Text(_)))) => false,
            Ok(_) => true,
        }
    }

    // =========================================================================
    // FAN-OUT
    // =========================================================================

    #[tokio::test]
    async fn test_each_subscriber_gets_one_event() {
        let bridge = TestBridge::start().await;
        let mut a = connect(&bridge).await;
        let mut b = connect(&bridge).await;
        bridge.wait_for_subscribers(2).await;

        let receipt = bridge.transport.deliver_from(SENDER, "hello");

        for client in [&mut a, &mut b] {
            let event = next_json(client).await;
            assert_eq!(event["sender"], SENDER.to_hex());
            assert_eq!(event["content"], "hello");
            assert_eq!(event["hash"], receipt.to_hex());
        }

        assert!(stays_quiet(&mut a, Duration::from_millis(200)).await);
        assert!(stays_quiet(&mut b, Duration::from_millis(200)).await);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_receipt_is_pushed_once() {
        let bridge = TestBridge::start().await;
        let mut client = connect(&bridge).await;
        bridge.wait_for_subscribers(1).await;

        let message = InboundMessage::new(SENDER, "once", ReceiptId::new(vec![0xbe, 0xef]));
        bridge.transport.deliver(message.clone());
        bridge.transport.deliver(message);

        let event = next_json(&mut client).await;
        assert_eq!(event["hash"], "beef");
        assert!(stays_quiet(&mut client, Duration::from_millis(300)).await);
        assert_eq!(bridge.service.status().dedup_set_size, 1);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_events_arrive_in_delivery_order() {
        let bridge = TestBridge::start().await;
        let mut client = connect(&bridge).await;
        bridge.wait_for_subscribers(1).await;

        for text in ["one", "two", "three"] {
            bridge.transport.deliver_from(SENDER, text);
        }

        let mut contents = Vec::new();
        for _ in 0..3 {
            contents.push(next_json(&mut client).await["content"].clone());
        }
        assert_eq!(contents, vec!["one", "two", "three"]);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_message_to_self_loops_back_to_stream() {
        let bridge = TestBridge::start().await;
        let local = bridge.service.local_address();
        bridge
            .transport
            .learn_identity(local, shared_types::Identity::new(vec![1; 32]));
        let mut client = connect(&bridge).await;
        bridge.wait_for_subscribers(1).await;

        let response = reqwest::Client::new()
            .post(bridge.url("/send"))
            .json(&serde_json::json!({"destination": local.to_hex(), "message": "echo"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert!(bridge.tick().await.dispatched);

        let event = next_json(&mut client).await;
        assert_eq!(event["sender"], local.to_hex());
        assert_eq!(event["content"], "echo");
        bridge.shutdown().await;
    }

    // =========================================================================
    // SEND OVER THE STREAM
    // =========================================================================

    #[tokio::test]
    async fn test_reply_frame_queues_message() {
        let bridge = TestBridge::start().await;
        let peer = bridge.known_peer(0x66);
        let mut client = connect(&bridge).await;
        bridge.wait_for_subscribers(1).await;

        let frame = serde_json::json!({"destination": peer.to_hex(), "message": "pong"});
        client.send(Message::Text(frame.to_string())).await.unwrap();

        let ack = next_json(&mut client).await;
        assert_eq!(ack["status"], "message queued");
        assert_eq!(bridge.service.status().queue_depth, 1);

        bridge.tick().await;
        assert_eq!(bridge.transport.sent_messages()[0].payload(), b"pong");
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_bad_reply_frame_gets_error_and_keeps_connection() {
        let bridge = TestBridge::start().await;
        let mut client = connect(&bridge).await;
        bridge.wait_for_subscribers(1).await;

        client.send(Message::Text("not json".into())).await.unwrap();
        assert!(next_json(&mut client).await["error"].is_string());

        let frame = serde_json::json!({"destination": "abcd", "message": "x"});
        client.send(Message::Text(frame.to_string())).await.unwrap();
        let reply = next_json(&mut client).await;
        assert!(reply["error"].as_str().unwrap().contains("length"));

        // Still subscribed
        bridge.transport.deliver_from(SENDER, "after errors");
        assert_eq!(next_json(&mut client).await["content"], "after errors");
        bridge.shutdown().await;
    }

    // =========================================================================
    // CONNECTION LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_disconnect_deregisters_subscriber() {
        let bridge = TestBridge::start().await;
        let mut client = connect(&bridge).await;
        bridge.wait_for_subscribers(1).await;

        client.close(None).await.unwrap();
        drop(client);
        bridge.wait_for_subscribers(0).await;

        // Delivery with nobody listening still records the receipt.
        bridge.transport.deliver_from(SENDER, "nobody home");
        assert_eq!(bridge.service.status().dedup_set_size, 1);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_open_streams() {
        let bridge = TestBridge::start().await;
        let mut client = connect(&bridge).await;
        bridge.wait_for_subscribers(1).await;

        bridge.signal_shutdown();

        let ended = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match client.next().await {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(ended.is_ok(), "stream stayed open after shutdown");
        bridge.wait_for_subscribers(0).await;
        bridge.shutdown().await;
    }
}
