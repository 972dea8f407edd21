//! Health Check Handlers
//!
//! Liveness and basic health endpoints, reporting bus state and active
//! connection counts per gateway namespace.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::startup::AppState;

/// Basic health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub bus: &'static str,
    pub connections: ConnectionCounts,
}

/// Active connections per gateway namespace
#[derive(Debug, Serialize)]
pub struct ConnectionCounts {
    pub user: usize,
    pub dms: usize,
    pub rooms: usize,
}

/// Simple liveness response
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// Basic health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let bus_open = !state.bus.is_closed();
    let response = HealthResponse {
        status: if bus_open { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        bus: if bus_open { "open" } else { "closed" },
        connections: ConnectionCounts {
            user: state.user_gateway.socket_count(),
            dms: state.dm_gateway.socket_count(),
            rooms: state.room_gateway.socket_count(),
        },
    };
    let status_code = if bus_open {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response))
}

/// Liveness probe - checks if the server is running
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}
