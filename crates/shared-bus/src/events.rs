//! # Inbound Events
//!
//! The event pushed to streaming clients, and the outcome of one fan-out.

use serde::{Deserialize, Serialize};
use shared_types::InboundMessage;

/// Wire shape of one inbound message on a streaming connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Sender address, hex.
    pub sender: String,
    /// Message content decoded as UTF-8 (lossy).
    pub content: String,
    /// Receipt id, hex.
    pub hash: String,
}

impl InboundEvent {
    pub fn from_message(message: &InboundMessage) -> Self {
        Self {
            sender: message.sender().to_hex(),
            content: message.content_text(),
            hash: message.receipt().to_hex(),
        }
    }

    /// JSON text frame for the streaming connection.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Receipt already seen; nothing was delivered.
    Duplicate,
    /// Fanned out. `dropped` subscribers failed the push and were deregistered.
    Delivered { delivered: usize, dropped: usize },
}
