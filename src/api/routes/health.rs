//! Health Routes
//!
//! - GET /health/live - process is alive
//! - GET /health/ready - a tick has been rendered
//! - GET /health - full status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// 503 until the chart service has rendered its first tick.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connection = state.connection_state();
    let ready = state.is_ready();

    let status = match (ready, connection.is_connected()) {
        (false, _) => "starting",
        (true, true) => "healthy",
        (true, false) => "degraded",
    };

    Json(HealthResponse {
        status: status.to_string(),
        feed: connection.to_string(),
        chart: if ready { "ok" } else { "pending" }.to_string(),
        viewers: state.ws_connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
