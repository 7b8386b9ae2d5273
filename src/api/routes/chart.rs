//! Chart Routes
//!
//! - GET / - viewer page
//! - GET /chart.svg - latest frame
//! - GET /api/v1/window - samples and domains
//! - GET /api/v1/status - feed and frame status

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{StatusResponse, WindowResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

const VIEWER_PAGE: &str = include_str!("../viewer.html");

/// GET /
///
/// Embeds the latest frame so the surface is drawn before the socket opens.
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let frame = state.chart.latest_frame();

    let page = VIEWER_PAGE
        .replace("{{ELEMENT_ID}}", &state.settings.element_id)
        .replace("{{DURATION_MS}}", &state.settings.duration_ms.to_string())
        .replace("{{INITIAL_SVG}}", &frame.svg);

    Html(page)
}

/// GET /chart.svg
pub async fn chart_svg(State(state): State<Arc<AppState>>) -> Response {
    let frame = state.chart.latest_frame();

    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        frame.svg.clone(),
    )
        .into_response()
}

/// GET /api/v1/window
pub async fn window(State(state): State<Arc<AppState>>) -> ApiResult<Json<WindowResponse>> {
    if !state.is_ready() {
        return Err(ApiError::NotReady("no tick rendered yet".to_string()));
    }

    let snapshot = state.chart.snapshot();

    Ok(Json(WindowResponse {
        samples: snapshot.samples.clone(),
        time_domain: snapshot.time_domain,
        value_domain: snapshot.value_domain,
        current_reading: snapshot.current_reading,
        span_ms: snapshot.span_ms,
        connection: state.connection_state(),
    }))
}

/// GET /api/v1/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let frame = state.chart.latest_frame();

    Json(StatusResponse {
        connection: state.connection_state(),
        feed_url: state.feed.url(),
        namespace: state.feed.namespace.clone(),
        event: state.feed.event.clone(),
        sequence: frame.sequence,
        sample_count: frame.sample_count,
        last_frame_at: frame.rendered_at,
        viewers: state.ws_connection_count().await,
    })
}
