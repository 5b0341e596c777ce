//! # Inbound Bus
//!
//! Entry point for the transport's delivery callback. Filters redelivered
//! receipts and fans the rest out to every registered subscriber.

use crate::dedup::{ReceiptDeduplicator, ReceiptStatus};
use crate::events::{DeliveryOutcome, InboundEvent};
use crate::registry::{PushFailure, Registry, SubscriberId};
use crate::subscriber::Subscription;
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_RECEIPT_CAPACITY};
use parking_lot::Mutex;
use serde::Serialize;
use shared_types::InboundMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sizing of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Per-subscriber buffer.
    pub channel_capacity: usize,
    /// Receipt ids kept for duplicate detection.
    pub receipt_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            receipt_capacity: DEFAULT_RECEIPT_CAPACITY,
        }
    }
}

/// Counters snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    pub received: u64,
    pub duplicates: u64,
    pub delivered: u64,
    pub dropped_subscribers: u64,
    pub subscribers: usize,
}

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    duplicates: AtomicU64,
    delivered: AtomicU64,
    dropped_subscribers: AtomicU64,
}

/// Deduplicating fan-out bus for inbound messages.
///
/// Safe to call from the transport's own thread: nothing here awaits or
/// blocks on a subscriber.
pub struct InboundBus {
    registry: Arc<Registry>,
    dedup: Mutex<ReceiptDeduplicator>,
    config: BusConfig,
    counters: Counters,
}

impl InboundBus {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        Self {
            registry: Arc::new(Registry::default()),
            dedup: Mutex::new(ReceiptDeduplicator::with_capacity(config.receipt_capacity)),
            config,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> BusConfig {
        self.config
    }

    /// Register a new subscriber. It receives every event accepted after
    /// this call returns.
    pub fn subscribe(&self) -> Subscription {
        let (id, rx) = self.registry.register(self.config.channel_capacity);
        Subscription::new(id, rx, Arc::downgrade(&self.registry))
    }

    /// Deregister explicitly. Returns false if already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.remove(id)
    }

    /// Handle one message from the transport.
    ///
    /// The dedup lock is held across the fan-out so that concurrent
    /// deliveries reach each subscriber in the order they were accepted.
    pub fn on_inbound_message(&self, message: &InboundMessage) -> DeliveryOutcome {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let mut dedup = self.dedup.lock();
        if dedup.check_and_record(message.receipt()) == ReceiptStatus::Duplicate {
            self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(receipt = %message.receipt(), "Duplicate receipt dropped");
            return DeliveryOutcome::Duplicate;
        }

        let event = InboundEvent::from_message(message);
        let (delivered, failed) = self.registry.broadcast(&event);
        drop(dedup);

        for (id, failure) in &failed {
            match failure {
                PushFailure::Full => {
                    warn!(subscriber = %id, "Subscriber buffer full, deregistering")
                }
                PushFailure::Closed => {
                    debug!(subscriber = %id, "Subscriber gone, deregistering")
                }
            }
            self.registry.remove(*id);
        }

        self.counters
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.counters
            .dropped_subscribers
            .fetch_add(failed.len() as u64, Ordering::Relaxed);

        info!(
            sender = %message.sender().pretty(),
            receipt = %message.receipt(),
            delivered,
            "Inbound message"
        );

        DeliveryOutcome::Delivered {
            delivered,
            dropped: failed.len(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of receipt ids currently remembered.
    pub fn dedup_len(&self) -> usize {
        self.dedup.lock().len()
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            received: self.counters.received.load(Ordering::Relaxed),
            duplicates: self.counters.duplicates.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped_subscribers: self.counters.dropped_subscribers.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }
}

impl Default for InboundBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::RecvOutcome;
    use shared_types::{Address, ReceiptId};
    use std::time::Duration;
    use tokio::time::timeout;

    fn message(receipt: u8, content: &str) -> InboundMessage {
        InboundMessage::new(
            Address::from_bytes([0x42; 16]),
            content,
            ReceiptId::new(vec![receipt]),
        )
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let bus = InboundBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let outcome = bus.on_inbound_message(&message(1, "hello"));
        assert_eq!(
            outcome,
            DeliveryOutcome::Delivered {
                delivered: 2,
                dropped: 0
            }
        );

        for sub in [&mut a, &mut b] {
            let event = timeout(Duration::from_millis(100), sub.recv())
                .await
                .expect("timeout")
                .expect("closed");
            assert_eq!(event.content, "hello");
            assert_eq!(event.hash, "01");
            assert_eq!(event.sender, "42".repeat(16));
        }
    }

    #[tokio::test]
    async fn test_duplicate_receipt_not_delivered() {
        let bus = InboundBus::new();
        let mut sub = bus.subscribe();

        bus.on_inbound_message(&message(7, "first"));
        assert_eq!(
            bus.on_inbound_message(&message(7, "again")),
            DeliveryOutcome::Duplicate
        );

        assert!(matches!(
            sub.recv_timeout(Duration::from_millis(100)).await,
            RecvOutcome::Event(e) if e.content == "first"
        ));
        assert_eq!(
            sub.recv_timeout(Duration::from_millis(30)).await,
            RecvOutcome::Timeout
        );
        assert_eq!(bus.stats().duplicates, 1);
    }

    #[test]
    fn test_no_subscribers_still_records_receipt() {
        let bus = InboundBus::new();
        assert_eq!(
            bus.on_inbound_message(&message(1, "x")),
            DeliveryOutcome::Delivered {
                delivered: 0,
                dropped: 0
            }
        );
        assert_eq!(bus.dedup_len(), 1);
        assert_eq!(
            bus.on_inbound_message(&message(1, "x")),
            DeliveryOutcome::Duplicate
        );
    }

    #[test]
    fn test_stalled_subscriber_deregistered() {
        let bus = InboundBus::with_config(BusConfig {
            channel_capacity: 1,
            receipt_capacity: 100,
        });
        let stalled = bus.subscribe();
        let mut healthy = bus.subscribe();

        bus.on_inbound_message(&message(1, "a"));
        healthy.try_recv().unwrap();

        let outcome = bus.on_inbound_message(&message(2, "b"));
        assert_eq!(
            outcome,
            DeliveryOutcome::Delivered {
                delivered: 1,
                dropped: 1
            }
        );
        assert!(!stalled.is_registered());
        assert!(healthy.is_registered());
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.stats().dropped_subscribers, 1);
    }

    #[test]
    fn test_drop_and_unsubscribe() {
        let bus = InboundBus::new();
        let sub = bus.subscribe();
        let other = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub);
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(other.id()));
        assert!(!bus.unsubscribe(other.id()));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_order_preserved_per_subscriber() {
        let bus = InboundBus::new();
        let mut sub = bus.subscribe();
        for n in 0..20u8 {
            bus.on_inbound_message(&message(n, &n.to_string()));
        }
        for n in 0..20u8 {
            let event = sub.recv().await.expect("closed");
            assert_eq!(event.content, n.to_string());
        }
    }

    #[test]
    fn test_dedup_window_is_bounded() {
        let bus = InboundBus::new();
        for n in 0..=255u8 {
            bus.on_inbound_message(&message(n, "x"));
        }
        assert_eq!(bus.dedup_len(), DEFAULT_RECEIPT_CAPACITY);
    }

    #[test]
    fn test_callable_from_plain_thread() {
        let bus = Arc::new(InboundBus::new());
        let mut sub = bus.subscribe();
        let producer = Arc::clone(&bus);
        std::thread::spawn(move || {
            producer.on_inbound_message(&message(9, "threaded"));
        })
        .join()
        .unwrap();
        assert_eq!(sub.try_recv().unwrap().unwrap().content, "threaded");
    }

    #[test]
    fn test_same_receipt_from_racing_threads_delivered_once() {
        const THREADS: usize = 8;
        let bus = Arc::new(InboundBus::new());
        let mut sub = bus.subscribe();
        let barrier = Arc::new(std::sync::Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let bus = Arc::clone(&bus);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    bus.on_inbound_message(&message(77, "raced"))
                })
            })
            .collect();

        let outcomes: Vec<DeliveryOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let delivered = outcomes
            .iter()
            .filter(|o| matches!(o, DeliveryOutcome::Delivered { .. }))
            .count();

        assert_eq!(delivered, 1);
        assert_eq!(bus.stats().duplicates, (THREADS - 1) as u64);
        assert_eq!(bus.dedup_len(), 1);
        assert_eq!(sub.try_recv().unwrap().unwrap().content, "raced");
        assert!(sub.try_recv().unwrap().is_none());
    }
}
