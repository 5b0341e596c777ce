//! WebSocket handler for the inbound event stream.
//!
//! Each connection runs two halves until either one ends:
//!
//! - the forwarder drains the connection's bus subscription with a bounded
//!   wait per read and writes events (and reply acks) to the socket. Every
//!   wait that times out re-checks the shutdown signal.
//! - the reader consumes client frames. A text frame shaped like a send
//!   request is queued exactly as `POST /send` would queue it.
//!
//! Dropping the subscription when the handler returns deregisters the client
//! from the bus.

use crate::domain::config::WebSocketConfig;
use crate::domain::error::ApiError;
use crate::middleware::GatewayMetrics;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use mb_01_lifecycle::{BridgeApi, LifecycleError, SendRequest};
use shared_bus::{RecvOutcome, SubscriberId, Subscription};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Why the forwarder stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForwardEnd {
    SocketClosed,
    Deregistered,
    Shutdown,
}

/// WebSocket connection handler
pub struct WebSocketHandler {
    bridge: Arc<dyn BridgeApi>,
    metrics: Arc<GatewayMetrics>,
    config: WebSocketConfig,
    shutdown: watch::Receiver<bool>,
}

impl WebSocketHandler {
    pub fn new(
        bridge: Arc<dyn BridgeApi>,
        metrics: Arc<GatewayMetrics>,
        config: WebSocketConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            bridge,
            metrics,
            config,
            shutdown,
        }
    }

    /// Handle a WebSocket connection
    pub async fn handle(self, socket: WebSocket) {
        // Subscribe before anything else so no event accepted after the
        // upgrade is missed.
        let subscription = self.bridge.subscribe();
        let connection_id = subscription.id();
        self.metrics.record_ws_connect();
        info!(connection = %connection_id, "WebSocket client connected");

        let (sink, stream) = socket.split();
        let (reply_tx, reply_rx) = mpsc::channel::<String>(self.config.reply_buffer);

        let forward = self.forward_events(subscription, sink, reply_rx);
        let read = self.read_frames(connection_id, stream, reply_tx);

        tokio::select! {
            end = forward => {
                debug!(connection = %connection_id, reason = ?end, "Forwarder finished");
            }
            _ = read => {
                debug!(connection = %connection_id, "Client stopped sending");
            }
        }

        self.metrics.record_ws_disconnect();
        info!(connection = %connection_id, "WebSocket client disconnected");
    }

    async fn forward_events(
        &self,
        mut subscription: Subscription,
        mut sink: SplitSink<WebSocket, Message>,
        mut replies: mpsc::Receiver<String>,
    ) -> ForwardEnd {
        let poll = self.config.poll_interval();
        let mut shutdown = self.shutdown.clone();

        loop {
            let frame = tokio::select! {
                outcome = subscription.recv_timeout(poll) => match outcome {
                    RecvOutcome::Event(event) => match event.to_json() {
                        Ok(json) => {
                            debug!(connection = %subscription.id(), hash = %event.hash, "Pushing event");
                            self.metrics.record_ws_message();
                            json
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to encode event");
                            continue;
                        }
                    },
                    RecvOutcome::Timeout => {
                        if *shutdown.borrow_and_update() {
                            if let Err(e) = sink.send(Message::Close(None)).await {
                                debug!(connection = %subscription.id(), error = %e, "Close frame not sent");
                            }
                            return ForwardEnd::Shutdown;
                        }
                        continue;
                    }
                    RecvOutcome::Closed => return ForwardEnd::Deregistered,
                },
                reply = replies.recv() => match reply {
                    Some(text) => text,
                    // Reader is gone; the select in `handle` ends the connection.
                    None => return ForwardEnd::SocketClosed,
                },
            };

            if let Err(e) = sink.send(Message::Text(frame)).await {
                debug!(connection = %subscription.id(), error = %e, "Socket write failed");
                return ForwardEnd::SocketClosed;
            }
        }
    }

    async fn read_frames(
        &self,
        connection_id: SubscriberId,
        mut stream: SplitStream<WebSocket>,
        replies: mpsc::Sender<String>,
    ) {
        while let Some(result) = stream.next().await {
            let response = match result {
                Ok(Message::Text(text)) => self.handle_text(&text).await,
                Ok(Message::Binary(_)) => error_frame("binary frames are not supported"),
                Ok(Message::Close(_)) => {
                    debug!(connection = %connection_id, "WebSocket close received");
                    break;
                }
                // Pings are answered by the protocol layer
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Err(e) => {
                    warn!(connection = %connection_id, error = %e, "WebSocket error");
                    break;
                }
            };

            if replies.send(response).await.is_err() {
                break;
            }
        }
    }

    /// Handle a single text frame from the client
    async fn handle_text(&self, text: &str) -> String {
        if text.len() > self.config.max_message_size {
            return error_frame(&format!(
                "Message too large: {} bytes (max: {})",
                text.len(),
                self.config.max_message_size
            ));
        }

        if !self.config.accept_replies {
            return error_frame("sending over the stream is disabled");
        }

        let request: SendRequest = match serde_json::from_str(text) {
            Ok(request) => request,
            Err(e) => return error_frame(&format!("Invalid request: {}", e)),
        };

        self.metrics.record_ws_reply();
        match self.bridge.send(request).await {
            Ok(()) => queued_frame(),
            Err(e) => {
                if matches!(e, LifecycleError::QueueFull) {
                    self.metrics.record_queue_full();
                }
                error_frame(&ApiError::from(e).message)
            }
        }
    }
}

/// Acknowledgement for a queued message
fn queued_frame() -> String {
    serde_json::json!({ "status": "message queued" }).to_string()
}

/// Error reply sent on the stream
fn error_frame(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
