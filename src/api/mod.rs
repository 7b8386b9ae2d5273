//! Viewer Server
//!
//! HTTP and WebSocket surface of the live chart, built with Axum.
//!
//! # Endpoints
//!
//! ## Chart
//! - `GET /` - Viewer page hosting the drawing surface
//! - `GET /chart.svg` - Latest frame as `image/svg+xml`
//! - `GET /api/v1/window` - Samples, domains and current reading
//! - `GET /api/v1/status` - Feed connection and frame status
//!
//! ## Health
//! - `GET /health/live` - Liveness check
//! - `GET /health/ready` - Readiness check (first tick rendered)
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws` - Frame and status stream

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ViewerConfig;
use crate::shutdown::wait_for_shutdown;
use crate::websocket::websocket_handler;

/// Build the viewer router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/window", get(routes::chart::window))
        .route("/status", get(routes::chart::status));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::chart::index))
        .route("/chart.svg", get(routes::chart::chart_svg))
        .route("/ws", get(websocket_handler))
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Serve the viewer until `shutdown` fires
pub async fn serve(
    state: AppState,
    config: &ViewerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Viewer listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { wait_for_shutdown(&mut shutdown).await })
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Viewer shut down gracefully");
    Ok(())
}
