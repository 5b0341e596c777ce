//! # Mesh Bridge Test Suite
//!
//! End-to-end tests that drive a real gateway over TCP.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # In-process bridge bound to 127.0.0.1:0
//! └── integration/
//!     ├── send_flow.rs    # POST /send → queue → dispatcher → transport
//!     └── stream_flow.rs  # transport → bus → /ws clients
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mb-tests
//! cargo test -p mb-tests integration::stream_flow
//! ```

pub mod harness;
pub mod integration;
