//! # Shared Types Crate
//!
//! Domain entities shared by the bridge crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: addresses, receipt ids and message entities
//!   are defined once, here.
//! - **Validate at the boundary**: an [`Address`] can only be built from input
//!   of exactly [`TRUNCATED_HASH_LENGTH`] bytes, so nothing downstream has to
//!   re-check it.
//! - **Immutable messages**: [`OutboundMessage`] and [`InboundMessage`] expose
//!   no mutating methods once constructed.

pub mod address;
pub mod entities;
pub mod errors;

pub use address::{Address, TRUNCATED_HASH_LENGTH};
pub use entities::*;
pub use errors::*;

/// Unix timestamp in seconds.
pub type Timestamp = u64;
