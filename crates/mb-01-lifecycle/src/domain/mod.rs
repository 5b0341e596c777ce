//! Domain layer: pure lifecycle logic, no I/O besides the injected ports.

pub mod announce;
pub mod config;
pub mod errors;
pub mod queue;

pub use announce::{AnnounceOutcome, AnnounceThrottler, ANNOUNCE_STATE_KEY};
pub use config::{LifecycleConfig, DEFAULT_DISPLAY_NAME};
pub use errors::LifecycleError;
pub use queue::OutboundQueue;
