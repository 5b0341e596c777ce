//! Error types for the lifecycle subsystem.

use crate::ports::outbound::{StoreError, TransportError};
use shared_types::{Address, AddressError};
use thiserror::Error;

/// Lifecycle errors.
///
/// The first three are caller errors and map to HTTP 400. `QueueFull` maps
/// to 503. The rest are internal and only ever logged.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Destination token is not hex.
    #[error("Invalid destination hash: {reason}")]
    InvalidAddressFormat { reason: String },

    /// Destination decodes to the wrong number of bytes.
    #[error("Invalid destination hash length: expected {expected} bytes, got {actual}")]
    InvalidAddressLength { expected: usize, actual: usize },

    /// No identity is known for the destination yet. A path request was sent.
    #[error(
        "Could not recall an identity for {address}; a path was requested, retry once it is announced"
    )]
    IdentityUnresolved { address: Address },

    /// Outbound queue stayed full for the whole enqueue wait.
    #[error("Outbound queue is full")]
    QueueFull,

    /// Outbound queue receiver is gone.
    #[error("Outbound queue is closed")]
    QueueClosed,

    #[error("Transport send failed: {0}")]
    TransportSendFailure(#[source] TransportError),

    #[error("Announce failed: {0}")]
    Announce(#[source] TransportError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to encode persisted state: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LifecycleError {
    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddressFormat { .. }
                | Self::InvalidAddressLength { .. }
                | Self::IdentityUnresolved { .. }
        )
    }
}

impl From<AddressError> for LifecycleError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::InvalidFormat { reason } => Self::InvalidAddressFormat { reason },
            AddressError::InvalidLength { expected, actual } => {
                Self::InvalidAddressLength { expected, actual }
            }
        }
    }
}
