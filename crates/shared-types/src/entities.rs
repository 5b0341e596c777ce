//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Outbound**: `Identity`, `OutboundMessage`, `DeliveryMethod`
//! - **Inbound**: `InboundMessage`, `ReceiptId`, `RawHandle`

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// CLUSTER A: OUTBOUND
// =============================================================================

/// Public identity material of a remote peer, as recalled by the transport.
///
/// The bridge never looks inside it; it is handed back to the transport
/// together with the message so the transport can encrypt for the recipient.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    public_key: Arc<[u8]>,
}

impl Identity {
    pub fn new(public_key: impl Into<Arc<[u8]>>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.public_key[..self.public_key.len().min(8)];
        write!(f, "Identity({}..)", hex::encode(shown))
    }
}

/// How the transport should attempt delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Establish a link to the destination and deliver over it.
    #[default]
    Direct,
    /// Single packet, no link.
    Opportunistic,
    /// Hand off to a propagation node for store-and-forward.
    Propagated,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Opportunistic => "opportunistic",
            Self::Propagated => "propagated",
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "opportunistic" => Ok(Self::Opportunistic),
            "propagated" => Ok(Self::Propagated),
            other => Err(format!(
                "unknown delivery method {:?}, expected direct, opportunistic or propagated",
                other
            )),
        }
    }
}

/// A prepared outbound message awaiting transmission.
///
/// Built only after the recipient identity was resolved, consumed exactly once
/// by the dispatcher.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    destination: Address,
    recipient: Identity,
    payload: Vec<u8>,
    title: String,
    method: DeliveryMethod,
    try_propagation_on_fail: bool,
}

impl OutboundMessage {
    /// Direct delivery with propagation fallback, the bridge's default policy.
    pub fn new(
        destination: Address,
        recipient: Identity,
        payload: impl Into<Vec<u8>>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            destination,
            recipient,
            payload: payload.into(),
            title: title.into(),
            method: DeliveryMethod::Direct,
            try_propagation_on_fail: true,
        }
    }

    pub fn with_method(mut self, method: DeliveryMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_propagation_fallback(mut self, enabled: bool) -> Self {
        self.try_propagation_on_fail = enabled;
        self
    }

    pub fn destination(&self) -> &Address {
        &self.destination
    }

    pub fn recipient(&self) -> &Identity {
        &self.recipient
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn method(&self) -> DeliveryMethod {
        self.method
    }

    /// Retry intent handed to the transport: fall back to a propagation node
    /// if direct delivery fails.
    pub fn try_propagation_on_fail(&self) -> bool {
        self.try_propagation_on_fail
    }
}

// =============================================================================
// CLUSTER B: INBOUND
// =============================================================================

/// Identifier assigned by the transport to an inbound message.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiptId(Vec<u8>);

impl ReceiptId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiptId({})", self.to_hex())
    }
}

/// Opaque transport-native message object.
pub type RawHandle = Arc<dyn Any + Send + Sync>;

/// A message delivered to the local identity.
#[derive(Clone)]
pub struct InboundMessage {
    sender: Address,
    content: Vec<u8>,
    title: Vec<u8>,
    receipt: ReceiptId,
    raw: Option<RawHandle>,
}

impl InboundMessage {
    pub fn new(sender: Address, content: impl Into<Vec<u8>>, receipt: ReceiptId) -> Self {
        Self {
            sender,
            content: content.into(),
            title: Vec::new(),
            receipt,
            raw: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<Vec<u8>>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_raw(mut self, raw: RawHandle) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn title(&self) -> &[u8] {
        &self.title
    }

    pub fn receipt(&self) -> &ReceiptId {
        &self.receipt
    }

    /// The transport's own message object, when it attached one.
    pub fn raw(&self) -> Option<&RawHandle> {
        self.raw.as_ref()
    }

    /// Content decoded as UTF-8, replacing invalid sequences.
    pub fn content_text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("sender", &self.sender)
            .field("content_len", &self.content.len())
            .field("receipt", &self.receipt)
            .field("has_raw", &self.raw.is_some())
            .finish()
    }
}
