//! # Message Lifecycle Subsystem
//!
//! Everything between the HTTP surface and the mesh transport.
//!
//! ## Architecture
//!
//! ```text
//!   send()                                       transport callback
//!     │                                                 │
//!     ▼                                                 ▼
//! ┌─────────┐  recall   ┌──────────┐          ┌──────────────────┐
//! │ Address │ ────────► │ Identity │          │ InboundBus       │
//! │ Codec   │           │ Resolver │          │ (dedup + fanout) │
//! └─────────┘           └──────────┘          └──────────────────┘
//!                            │ known
//!                            ▼
//!                     ┌───────────────┐ dequeue_one ┌────────────┐
//!                     │ OutboundQueue │ ──────────► │ Dispatcher │ ─► send / announce
//!                     └───────────────┘             └────────────┘
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Only 16-byte destinations are queued | `Address::from_hex` in `BridgeService::send` |
//! | Queue never exceeds its capacity | bounded `tokio::sync::mpsc` channel |
//! | At most one announce per interval | `AnnounceThrottler` persists before announcing |
//! | One delivery per receipt in window | `shared_bus::ReceiptDeduplicator` |
//!
//! ## Module Structure
//!
//! - `domain/` - queue, throttler, config, errors
//! - `ports/` - inbound API and outbound collaborator traits
//! - `adapters/` - state stores and the loopback transport
//! - `dispatcher` - the periodic drain loop
//! - `service` - wires everything into `BridgeService`

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod dispatcher;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FileStateStore, InMemoryStateStore, LoopbackTransport};
pub use dispatcher::{Dispatcher, TickReport};
pub use domain::{
    AnnounceOutcome, AnnounceThrottler, LifecycleConfig, LifecycleError, OutboundQueue,
    ANNOUNCE_STATE_KEY, DEFAULT_DISPLAY_NAME,
};
pub use ports::inbound::{BridgeApi, BridgeStatus, SendRequest, DEFAULT_TITLE};
pub use ports::outbound::{
    DeliveryCallback, IdentityResolver, ManualTimeSource, MeshTransport, StateStore, StoreError,
    SystemTimeSource, TimeSource, TransportError,
};
pub use service::BridgeService;
