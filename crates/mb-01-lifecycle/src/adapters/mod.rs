//! Adapters layer: concrete implementations of the outbound ports.
//!
//! - `file_store`: `FileStateStore`, one file per key with atomic replace and
//!   an `fs2` directory lock
//! - `memory_store`: `InMemoryStateStore` for tests and ephemeral runs
//! - `loopback`: `LoopbackTransport`, an in-process transport and resolver

pub mod file_store;
pub mod loopback;
pub mod memory_store;

pub use file_store::FileStateStore;
pub use loopback::LoopbackTransport;
pub use memory_store::InMemoryStateStore;
