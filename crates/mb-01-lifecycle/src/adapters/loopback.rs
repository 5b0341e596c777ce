//! # Loopback Transport
//!
//! In-process stand-in for the mesh transport.
//!
//! - identities are learned explicitly with [`LoopbackTransport::learn_identity`]
//! - path requests and sent messages are recorded for inspection
//! - messages addressed to the local address are delivered back through the
//!   registered callbacks, as if they had crossed the network
//! - [`LoopbackTransport::deliver`] injects an inbound message directly

use crate::ports::outbound::{DeliveryCallback, IdentityResolver, MeshTransport, TransportError};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{Address, Identity, InboundMessage, OutboundMessage, ReceiptId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

pub struct LoopbackTransport {
    local: Address,
    identities: RwLock<HashMap<Address, Identity>>,
    callbacks: RwLock<Vec<DeliveryCallback>>,
    path_requests: Mutex<Vec<Address>>,
    sent: Mutex<Vec<OutboundMessage>>,
    announced_names: Mutex<Vec<String>>,
    next_receipt: AtomicU64,
    online: AtomicBool,
}

impl LoopbackTransport {
    pub fn new(local: Address) -> Self {
        Self {
            local,
            identities: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(Vec::new()),
            path_requests: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            announced_names: Mutex::new(Vec::new()),
            next_receipt: AtomicU64::new(0),
            online: AtomicBool::new(true),
        }
    }

    /// Make `identity` recallable for `address`, as a received announce would.
    pub fn learn_identity(&self, address: Address, identity: Identity) {
        self.identities.write().insert(address, identity);
    }

    /// While offline, `send`, `announce` and `request_path` fail.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Hand `message` to every registered delivery callback.
    pub fn deliver(&self, message: InboundMessage) {
        let callbacks: Vec<DeliveryCallback> = self.callbacks.read().clone();
        for callback in callbacks {
            callback(message.clone());
        }
    }

    /// Deliver `content` from `sender` under a fresh receipt id.
    pub fn deliver_from(&self, sender: Address, content: impl Into<Vec<u8>>) -> ReceiptId {
        let receipt = self.fresh_receipt();
        self.deliver(InboundMessage::new(sender, content, receipt.clone()));
        receipt
    }

    pub fn announce_count(&self) -> u64 {
        self.announced_names.lock().len() as u64
    }

    /// Display name carried by the most recent announce.
    pub fn last_announced_name(&self) -> Option<String> {
        self.announced_names.lock().last().cloned()
    }

    pub fn path_requests(&self) -> Vec<Address> {
        self.path_requests.lock().clone()
    }

    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    fn fresh_receipt(&self) -> ReceiptId {
        let n = self.next_receipt.fetch_add(1, Ordering::SeqCst);
        let mut bytes = self.local.as_bytes().to_vec();
        bytes.extend_from_slice(&n.to_be_bytes());
        ReceiptId::new(bytes)
    }

    fn ensure_online(&self) -> Result<(), TransportError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Unavailable("loopback transport offline".into()))
        }
    }
}

#[async_trait]
impl MeshTransport for LoopbackTransport {
    fn local_address(&self) -> Address {
        self.local
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.ensure_online()?;
        debug!(
            destination = %message.destination().pretty(),
            method = ?message.method(),
            "Loopback send"
        );

        let echo = (*message.destination() == self.local).then(|| {
            InboundMessage::new(self.local, message.payload().to_vec(), self.fresh_receipt())
                .with_title(message.title().as_bytes().to_vec())
        });

        self.sent.lock().push(message);

        if let Some(inbound) = echo {
            self.deliver(inbound);
        }
        Ok(())
    }

    async fn announce(&self, display_name: &str) -> Result<(), TransportError> {
        self.ensure_online()?;
        debug!(address = %self.local.pretty(), name = display_name, "Loopback announce");
        self.announced_names.lock().push(display_name.to_string());
        Ok(())
    }

    fn register_delivery_callback(&self, callback: DeliveryCallback) {
        self.callbacks.write().push(callback);
    }
}

#[async_trait]
impl IdentityResolver for LoopbackTransport {
    fn recall(&self, address: &Address) -> Option<Identity> {
        self.identities.read().get(address).cloned()
    }

    async fn request_path(&self, address: &Address) -> Result<(), TransportError> {
        self.ensure_online()?;
        self.path_requests.lock().push(*address);
        info!(address = %address.pretty(), "Path requested");
        Ok(())
    }
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("local", &self.local)
            .finish()
    }
}
