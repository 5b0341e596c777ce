//! Subscriber registry: the set of live push channels.

use crate::events::InboundEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Unique id of one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Why a push to one subscriber failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushFailure {
    Full,
    Closed,
}

#[derive(Default)]
pub(crate) struct Registry {
    next_id: AtomicU64,
    senders: RwLock<HashMap<SubscriberId, mpsc::Sender<InboundEvent>>>,
}

impl Registry {
    pub(crate) fn register(&self, capacity: usize) -> (SubscriberId, mpsc::Receiver<InboundEvent>) {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.senders.write().insert(id, tx);
        debug!(subscriber = %id, "Subscriber registered");
        (id, rx)
    }

    /// Returns false if `id` was not registered.
    pub(crate) fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.senders.write().remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, "Subscriber removed");
        }
        removed
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.senders.read().contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.read().len()
    }

    /// Push `event` to every subscriber without waiting.
    ///
    /// Returns the number of successful pushes and the subscribers that
    /// could not accept the event.
    pub(crate) fn broadcast(&self, event: &InboundEvent) -> (usize, Vec<(SubscriberId, PushFailure)>) {
        let senders = self.senders.read();
        let mut delivered = 0;
        let mut failed = Vec::new();

        for (id, tx) in senders.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => failed.push((*id, PushFailure::Full)),
                Err(TrySendError::Closed(_)) => failed.push((*id, PushFailure::Closed)),
            }
        }

        (delivered, failed)
    }
}
