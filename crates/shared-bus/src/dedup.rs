//! # Receipt Deduplicator
//!
//! The transport may redeliver a message. Receipt ids of recently delivered
//! messages are kept in a bounded recency list so a redelivery is dropped.
//!
//! ## Eviction
//!
//! Pure FIFO: the oldest recorded id is evicted once the list exceeds its
//! capacity. Lookups do not refresh an entry. A true duplicate that arrives
//! after `capacity` newer distinct ids is therefore delivered again; this is
//! the price of bounded memory.

use crate::DEFAULT_RECEIPT_CAPACITY;
use shared_types::ReceiptId;
use std::collections::{HashSet, VecDeque};

/// Result of [`ReceiptDeduplicator::check_and_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// First sighting inside the window; the caller should deliver.
    New,
    /// Already recorded; the caller must not deliver again.
    Duplicate,
}

/// Bounded recency set of receipt ids.
///
/// Not synchronized on its own; the bus holds it behind a mutex so that the
/// check and the insert form one atomic step.
#[derive(Debug)]
pub struct ReceiptDeduplicator {
    /// Insertion order, oldest at the front.
    order: VecDeque<ReceiptId>,
    /// Membership index over `order`.
    seen: HashSet<ReceiptId>,
    capacity: usize,
    duplicates: u64,
}

impl ReceiptDeduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RECEIPT_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity + 1),
            seen: HashSet::with_capacity(capacity + 1),
            capacity,
            duplicates: 0,
        }
    }

    /// Record `id` unless it is already present.
    pub fn check_and_record(&mut self, id: &ReceiptId) -> ReceiptStatus {
        if self.seen.contains(id) {
            self.duplicates += 1;
            return ReceiptStatus::Duplicate;
        }

        self.order.push_back(id.clone());
        self.seen.insert(id.clone());

        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }

        ReceiptStatus::New
    }

    #[must_use]
    pub fn contains(&self, id: &ReceiptId) -> bool {
        self.seen.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total duplicates rejected since creation.
    #[must_use]
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}

impl Default for ReceiptDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(n: u32) -> ReceiptId {
        ReceiptId::new(n.to_be_bytes().to_vec())
    }

    #[test]
    fn test_new_then_duplicate() {
        let mut dedup = ReceiptDeduplicator::new();
        assert_eq!(dedup.check_and_record(&receipt(1)), ReceiptStatus::New);
        assert_eq!(dedup.check_and_record(&receipt(1)), ReceiptStatus::Duplicate);
        assert_eq!(dedup.check_and_record(&receipt(1)), ReceiptStatus::Duplicate);
        assert_eq!(dedup.len(), 1);
        assert_eq!(dedup.duplicates(), 2);
    }

    #[test]
    fn test_duplicate_until_capacity_distinct_ids_evict_it() {
        let mut dedup = ReceiptDeduplicator::new();
        assert_eq!(dedup.check_and_record(&receipt(0)), ReceiptStatus::New);

        // 99 newer ids keep receipt 0 inside the window.
        for n in 1..100 {
            assert_eq!(dedup.check_and_record(&receipt(n)), ReceiptStatus::New);
        }
        assert_eq!(dedup.check_and_record(&receipt(0)), ReceiptStatus::Duplicate);

        // The 100th newer id pushes it out.
        assert_eq!(dedup.check_and_record(&receipt(100)), ReceiptStatus::New);
        assert!(!dedup.contains(&receipt(0)));
        assert_eq!(dedup.check_and_record(&receipt(0)), ReceiptStatus::New);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut dedup = ReceiptDeduplicator::with_capacity(10);
        for n in 0..1000 {
            dedup.check_and_record(&receipt(n));
            assert!(dedup.len() <= 10);
        }
        assert_eq!(dedup.len(), 10);
        assert!(dedup.contains(&receipt(999)));
        assert!(dedup.contains(&receipt(990)));
        assert!(!dedup.contains(&receipt(989)));
    }

    #[test]
    fn test_lookup_does_not_refresh_entry() {
        let mut dedup = ReceiptDeduplicator::with_capacity(2);
        dedup.check_and_record(&receipt(1));
        dedup.check_and_record(&receipt(2));
        // A duplicate hit on 1 must not move it to the back.
        assert_eq!(dedup.check_and_record(&receipt(1)), ReceiptStatus::Duplicate);
        dedup.check_and_record(&receipt(3));
        assert!(!dedup.contains(&receipt(1)));
        assert!(dedup.contains(&receipt(2)));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let dedup = ReceiptDeduplicator::with_capacity(0);
        assert_eq!(dedup.capacity(), 1);
        assert!(dedup.is_empty());
    }
}
