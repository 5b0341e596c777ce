//! Cross-crate flows over real sockets.

pub mod send_flow;
pub mod stream_flow;
