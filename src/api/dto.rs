//! Data Transfer Objects
//!
//! Response types for the viewer endpoints.

use serde::Serialize;

use crate::chart::Sample;
use crate::feed::ConnectionState;

/// GET /health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy", "degraded" or "starting"
    pub status: String,
    /// Feed connection state name
    pub feed: String,
    /// "ok" once a tick has rendered
    pub chart: String,
    pub viewers: usize,
    pub uptime_seconds: u64,
    pub version: String,
}

/// GET /api/v1/status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connection: ConnectionState,
    /// Socket.IO endpoint readings come from
    pub feed_url: String,
    pub namespace: String,
    pub event: String,
    /// Sequence number of the latest frame
    pub sequence: u64,
    pub sample_count: usize,
    pub last_frame_at: i64,
    pub viewers: usize,
}

/// GET /api/v1/window
#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub samples: Vec<Sample>,
    pub time_domain: (i64, i64),
    pub value_domain: (f64, f64),
    pub current_reading: f64,
    pub span_ms: i64,
    pub connection: ConnectionState,
}
