//! MB-02 API Gateway - HTTP and WebSocket surface of the mesh bridge.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     API GATEWAY (mb-02)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  POST /send   GET /status   GET /ws   GET /health  /metrics  │
//! │       │            │           │                             │
//! │  ┌────┴────────────┴───────────┴────┐                        │
//! │  │  Middleware: CORS → Tracing      │                        │
//! │  └────────────────┬─────────────────┘                        │
//! │                   │                                          │
//! │        ┌──────────┴──────────┐     ┌───────────────────────┐ │
//! │        │  BridgeApi (mb-01)  │ ◄── │  WebSocketHandler     │ │
//! │        └─────────────────────┘     │  forwarder + replies  │ │
//! │                                    └───────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Routes
//!
//! | Route | Result |
//! |-------|--------|
//! | `POST /send` | `{"status":"message queued"}`, or `{"detail":...}` with 400/503 |
//! | `GET /status` | queue depth, dedup size, local address, subscriber count |
//! | `GET /ws` | stream of `{sender, content, hash}` text frames |
//! | `GET /health` | liveness |
//! | `GET /metrics` | gateway counters |
//!
//! # Usage
//!
//! ```ignore
//! use mb_02_api_gateway::{ApiGatewayService, GatewayConfig};
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let gateway = ApiGatewayService::new(GatewayConfig::default(), bridge, shutdown_rx)?;
//! gateway.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod router;
pub mod service;
pub mod ws;

// Re-exports for public API
pub use domain::config::{ConfigError, CorsConfig, GatewayConfig, HttpConfig, WebSocketConfig};
pub use domain::error::{ApiError, ApiResult, GatewayError};
pub use middleware::GatewayMetrics;
pub use router::{build_router, AppState};
pub use service::ApiGatewayService;
pub use ws::WebSocketHandler;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
