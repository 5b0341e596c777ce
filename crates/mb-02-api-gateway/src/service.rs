//! API Gateway service - owns the router and the HTTP listener.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::middleware::GatewayMetrics;
use crate::router::{build_router, AppState};
use axum::Router;
use mb_01_lifecycle::BridgeApi;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// API Gateway service state
pub struct ApiGatewayService {
    config: GatewayConfig,
    bridge: Arc<dyn BridgeApi>,
    metrics: Arc<GatewayMetrics>,
    shutdown: watch::Receiver<bool>,
}

impl ApiGatewayService {
    /// Create a new API Gateway service.
    ///
    /// `shutdown` flipping to `true` stops the listener and closes every
    /// open event stream.
    pub fn new(
        config: GatewayConfig,
        bridge: Arc<dyn BridgeApi>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            config,
            bridge,
            metrics: Arc::new(GatewayMetrics::new()),
            shutdown,
        })
    }

    /// Build the full router over this service's state
    pub fn router(&self) -> Router {
        let state = AppState {
            bridge: Arc::clone(&self.bridge),
            metrics: Arc::clone(&self.metrics),
            websocket: self.config.websocket.clone(),
            shutdown: self.shutdown.clone(),
        };
        build_router(state, &self.config)
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve on an already bound listener until shutdown is signalled
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GatewayError> {
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(%addr, "HTTP server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(wait_for_shutdown(self.shutdown.clone()))
            .await
            .map_err(|e| GatewayError::Serve(e.to_string()))?;

        info!("API Gateway stopped");
        Ok(())
    }

    /// Bind the configured address and serve.
    ///
    /// With HTTP disabled this only waits for the shutdown signal.
    pub async fn start(&self) -> Result<(), GatewayError> {
        if !self.config.http.enabled {
            info!("HTTP server disabled");
            wait_for_shutdown(self.shutdown.clone()).await;
            return Ok(());
        }

        let addr = self.config.http_addr();
        info!(%addr, "Starting API Gateway");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{}: {}", addr, e)))?;
        self.serve(listener).await
    }
}

/// Resolves once the flag is set or its sender is gone
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
