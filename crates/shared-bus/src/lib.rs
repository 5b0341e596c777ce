//! # Shared Bus - Inbound Fan-out Bus
//!
//! Carries messages delivered by the mesh transport to every live streaming
//! client.
//!
//! ```text
//!  transport thread                         subscriber tasks
//! ┌────────────────┐   on_inbound_message  ┌──────────────┐
//! │ delivery       │ ─────────┐            │ Subscription │ ← recv_timeout()
//! │ callback       │          ▼            └──────────────┘
//! └────────────────┘   ┌──────────────┐          ▲
//!                      │ Receipt      │  New     │ try_send
//!                      │ Deduplicator │ ───► Registry ───► ...
//!                      └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **At-most-once per receipt window:** a receipt id seen within the last
//!   `receipt_capacity` distinct ids is dropped before fan-out.
//! - **Non-blocking intake:** pushes use `try_send`; a subscriber that cannot
//!   accept an event is deregistered instead of stalling the transport thread.
//! - **Per-subscriber ordering:** events reach one subscriber in arrival order.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dedup;
pub mod events;
pub mod publisher;
pub mod registry;
pub mod subscriber;

// Re-export main types
pub use dedup::{ReceiptDeduplicator, ReceiptStatus};
pub use events::{DeliveryOutcome, InboundEvent};
pub use publisher::{BusConfig, BusStats, InboundBus};
pub use registry::SubscriberId;
pub use subscriber::{RecvOutcome, Subscription, SubscriptionError};

/// Receipt ids remembered for duplicate detection.
pub const DEFAULT_RECEIPT_CAPACITY: usize = 100;

/// Events buffered per subscriber before it counts as stalled.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
