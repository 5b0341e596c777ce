//! WebSocket module: inbound event stream plus send-over-stream.

pub mod handler;

pub use handler::WebSocketHandler;
