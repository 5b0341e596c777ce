//! HTTP routes and their handlers.

use crate::domain::config::{GatewayConfig, WebSocketConfig};
use crate::domain::error::{ApiError, ApiResult};
use crate::middleware::{create_cors_layer, GatewayMetrics, RequestTimer, TracingLayer};
use crate::ws::WebSocketHandler;
use axum::{
    extract::{rejection::JsonRejection, ws::WebSocketUpgrade, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mb_01_lifecycle::{BridgeApi, BridgeStatus, LifecycleError, SendRequest};
use std::sync::Arc;
use tokio::sync::watch;
use tower::ServiceBuilder;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<dyn BridgeApi>,
    pub metrics: Arc<GatewayMetrics>,
    pub websocket: WebSocketConfig,
    pub shutdown: watch::Receiver<bool>,
}

/// Build the gateway router with its middleware stack
pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(create_cors_layer(&config.cors))
        .layer(TracingLayer::new());

    Router::new()
        .route("/send", post(send_message))
        .route("/status", get(get_status))
        .route("/ws", get(websocket_upgrade))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .layer(middleware)
        .with_state(state)
}

/// `POST /send`
async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let timer = RequestTimer::new(Arc::clone(&state.metrics), true);

    let result = match payload {
        Ok(Json(request)) => state.bridge.send(request).await.map_err(|e| {
            if matches!(e, LifecycleError::QueueFull) {
                state.metrics.record_queue_full();
            }
            ApiError::from(e)
        }),
        Err(rejection) => Err(ApiError::from(rejection)),
    };

    timer.finish(result.is_ok());
    result.map(|()| Json(serde_json::json!({ "status": "message queued" })))
}

/// `GET /status`
async fn get_status(State(state): State<AppState>) -> Json<BridgeStatus> {
    let timer = RequestTimer::new(Arc::clone(&state.metrics), false);
    let status = state.bridge.status();
    timer.finish(true);
    Json(status)
}

/// `GET /ws`
async fn websocket_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let handler = WebSocketHandler::new(
        Arc::clone(&state.bridge),
        Arc::clone(&state.metrics),
        state.websocket.clone(),
        state.shutdown.clone(),
    );

    ws.max_message_size(state.websocket.max_message_size)
        .on_upgrade(move |socket| handler.handle(socket))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mesh-bridge",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `GET /metrics`
async fn get_metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.metrics.to_json())
}
