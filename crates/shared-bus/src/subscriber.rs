//! # Subscription
//!
//! The receiving end of one streaming client. Dropping it deregisters the
//! subscriber from the bus.

use crate::events::InboundEvent;
use crate::registry::{Registry, SubscriberId};
use std::sync::Weak;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Result of a bounded wait for the next event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvOutcome {
    Event(InboundEvent),
    /// Nothing arrived within the wait.
    Timeout,
    /// The subscriber was deregistered or the bus is gone, and the buffer is
    /// drained.
    Closed,
}

/// Errors from non-waiting receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("subscription closed")]
    Closed,
}

/// A live subscription to inbound events.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<InboundEvent>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        receiver: mpsc::Receiver<InboundEvent>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            id,
            receiver,
            registry,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event. Returns `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        self.receiver.recv().await
    }

    /// Wait at most `wait` for the next event.
    pub async fn recv_timeout(&mut self, wait: Duration) -> RecvOutcome {
        match tokio::time::timeout(wait, self.receiver.recv()).await {
            Ok(Some(event)) => RecvOutcome::Event(event),
            Ok(None) => RecvOutcome::Closed,
            Err(_) => RecvOutcome::Timeout,
        }
    }

    /// Take a buffered event if there is one.
    pub fn try_recv(&mut self) -> Result<Option<InboundEvent>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Whether the bus still pushes to this subscription.
    pub fn is_registered(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
