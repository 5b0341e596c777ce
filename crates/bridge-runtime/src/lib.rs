//! # Bridge Runtime Library
//!
//! Exposes the runtime pieces for testing. The entry point is the
//! `mesh-bridge` binary in `main.rs`.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Load or create the local identity under the data directory
//! 3. Open the state store (exclusive lock on the data directory)
//! 4. Build the bridge service and reset the announce deadline if asked
//! 5. Spawn the dispatcher and the API gateway
//! 6. Wait for the stop signal, then shut both down

pub mod config;
pub mod identity;
pub mod runtime;

pub use config::{load_config, RuntimeConfig};
pub use identity::LocalIdentity;
pub use runtime::BridgeRuntime;
