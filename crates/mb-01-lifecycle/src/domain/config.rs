use serde::{Deserialize, Serialize};
use shared_bus::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_RECEIPT_CAPACITY};
use shared_types::DeliveryMethod;
use std::time::Duration;

/// Name announced when none is configured.
pub const DEFAULT_DISPLAY_NAME: &str = "LXMFAPI";

/// Lifecycle tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Outbound queue capacity.
    pub queue_capacity: usize,
    /// Seconds between dispatcher ticks.
    pub dispatch_interval_secs: u64,
    /// Minimum seconds between two announces.
    pub announce_interval_secs: u64,
    /// Receipt ids remembered for duplicate detection.
    pub dedup_capacity: usize,
    /// Per-subscriber event buffer.
    pub subscriber_buffer: usize,
    /// `None` blocks `send` until the queue has room.
    pub enqueue_timeout_secs: Option<u64>,
    /// Name carried by every announce of the local identity.
    pub display_name: String,
    /// Delivery method stamped on outbound messages.
    pub delivery_method: DeliveryMethod,
    /// Let the transport fall back to a propagation node when delivery fails.
    pub propagation_fallback: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 5,
            dispatch_interval_secs: 10,
            announce_interval_secs: 600,
            dedup_capacity: DEFAULT_RECEIPT_CAPACITY,
            subscriber_buffer: DEFAULT_CHANNEL_CAPACITY,
            enqueue_timeout_secs: None,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            delivery_method: DeliveryMethod::Direct,
            propagation_fallback: true,
        }
    }
}

impl LifecycleConfig {
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_secs)
    }

    pub fn enqueue_timeout(&self) -> Option<Duration> {
        self.enqueue_timeout_secs.map(Duration::from_secs)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.display_name.trim().is_empty() {
            return Err("display_name cannot be empty".into());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be at least 1".into());
        }
        if self.dispatch_interval_secs == 0 {
            return Err("dispatch_interval_secs must be at least 1".into());
        }
        if self.dedup_capacity == 0 {
            return Err("dedup_capacity must be at least 1".into());
        }
        if self.subscriber_buffer == 0 {
            return Err("subscriber_buffer must be at least 1".into());
        }
        Ok(())
    }
}
