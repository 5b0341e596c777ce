//! Outbound (Driven) ports for the lifecycle subsystem.
//!
//! The mesh transport, identity resolution, durable state and the clock are
//! all external collaborators reached through these traits.

use async_trait::async_trait;
use shared_types::{Address, Identity, InboundMessage, OutboundMessage, Timestamp};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Callback the transport invokes for each message delivered to us.
///
/// Runs on whatever thread the transport uses; must not block.
pub type DeliveryCallback = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("message rejected by transport: {0}")]
    Rejected(String),
}

/// The mesh messaging transport.
#[async_trait]
pub trait MeshTransport: Send + Sync {
    /// Address of the local delivery identity.
    fn local_address(&self) -> Address;

    /// Hand a prepared message to the transport's outbound handling.
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError>;

    /// Broadcast the local identity's presence under `display_name`.
    async fn announce(&self, display_name: &str) -> Result<(), TransportError>;

    /// Register the callback for inbound deliveries.
    fn register_delivery_callback(&self, callback: DeliveryCallback);
}

/// Address to identity resolution.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Identity previously learned for `address`, if any.
    fn recall(&self, address: &Address) -> Option<Identity>;

    /// Ask the network for a path to `address`. Fire and forget; an announce
    /// carrying the identity may arrive later.
    async fn request_path(&self, address: &Address) -> Result<(), TransportError>;
}

/// Durable state store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state directory already in use ({})", path.display())]
    Locked { path: PathBuf },

    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}

/// Small durable key-value store.
///
/// `put` must be atomic: a reader sees either the old value or the new one,
/// never a partial write.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Settable clock for tests.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
