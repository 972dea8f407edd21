//! Route Configuration
//!
//! Configures the gateway upgrade routes and operational endpoints.

use axum::{response::IntoResponse, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::health;
use crate::infrastructure::metrics;
use crate::presentation::websocket::{
    dm_events_handler, room_events_handler, user_events_handler,
};
use crate::startup::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // WebSocket gateway endpoints, one per event namespace
        .route("/gateway/user", get(user_events_handler))
        .route("/gateway/dms", get(dm_events_handler))
        .route("/gateway/rooms", get(room_events_handler))
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}
