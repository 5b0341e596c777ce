//! # Outbound Queue
//!
//! Bounded FIFO between request handlers and the dispatcher.
//!
//! Producers apply backpressure: `enqueue` waits for a free slot instead of
//! dropping anything. The single consumer drains with `dequeue_one`, which
//! never waits.

use crate::domain::errors::LifecycleError;
use parking_lot::Mutex;
use shared_types::OutboundMessage;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

pub struct OutboundQueue {
    tx: mpsc::Sender<OutboundMessage>,
    rx: Mutex<mpsc::Receiver<OutboundMessage>>,
    capacity: usize,
}

impl OutboundQueue {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }

    /// Append `message`, waiting while the queue is full.
    pub async fn enqueue(&self, message: OutboundMessage) -> Result<(), LifecycleError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| LifecycleError::QueueClosed)
    }

    /// Append `message` only if there is room right now.
    pub fn try_enqueue(&self, message: OutboundMessage) -> Result<(), LifecycleError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => LifecycleError::QueueFull,
            TrySendError::Closed(_) => LifecycleError::QueueClosed,
        })
    }

    /// Like [`OutboundQueue::enqueue`], giving up with `QueueFull` after `wait`.
    pub async fn enqueue_timeout(
        &self,
        message: OutboundMessage,
        wait: Duration,
    ) -> Result<(), LifecycleError> {
        match tokio::time::timeout(wait, self.tx.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(LifecycleError::QueueClosed),
            Err(_) => Err(LifecycleError::QueueFull),
        }
    }

    /// Remove the oldest message, if any.
    pub fn dequeue_one(&self) -> Option<OutboundMessage> {
        match self.rx.lock().try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Messages currently waiting.
    pub fn depth(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }
}

impl std::fmt::Debug for OutboundQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundQueue")
            .field("depth", &self.depth())
            .field("capacity", &self.capacity)
            .finish()
    }
}
