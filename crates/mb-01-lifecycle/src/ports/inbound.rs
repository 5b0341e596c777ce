//! Inbound (Driving) ports: what the HTTP surface may ask of the bridge.

use crate::domain::errors::LifecycleError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_bus::Subscription;

/// Title used when a send request does not carry one.
pub const DEFAULT_TITLE: &str = "Reply";

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

/// An outbound message as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    /// Destination address, hex.
    pub destination: String,
    pub message: String,
    #[serde(default = "default_title")]
    pub title: String,
}

impl SendRequest {
    pub fn new(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            message: message.into(),
            title: default_title(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Point-in-time view of the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub queue_depth: usize,
    pub queue_capacity: usize,
    /// Receipt ids currently tracked for duplicate detection.
    pub dedup_set_size: usize,
    /// Local delivery address in display form, `<hex>`. Not accepted by `send`.
    pub local_address: String,
    /// Local delivery address as plain hex, usable as a `send` destination.
    pub local_hash: String,
    pub subscribers: usize,
}

/// Operations exposed to the gateway.
#[async_trait]
pub trait BridgeApi: Send + Sync {
    /// Validate, resolve and queue one outbound message.
    async fn send(&self, request: SendRequest) -> Result<(), LifecycleError>;

    fn status(&self) -> BridgeStatus;

    /// Open a new inbound event subscription.
    fn subscribe(&self) -> Subscription;
}
