//! Connection state published by the feed client

use serde::Serialize;

/// Where the feed connection currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Opening the socket or joining the namespace
    Connecting,
    /// Namespace joined, readings flowing
    Connected,
    /// Lost; another attempt follows after `retry_in_ms`
    Disconnected { attempt: u32, retry_in_ms: u64 },
    /// Gave up, or shut down
    Stopped,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Label drawn on the chart while readings are not flowing
    pub fn label(&self) -> Option<String> {
        match self {
            ConnectionState::Connected => None,
            ConnectionState::Connecting => Some("connecting…".to_string()),
            ConnectionState::Disconnected { retry_in_ms, .. } => Some(format!(
                "disconnected, retrying in {:.1}s",
                *retry_in_ms as f64 / 1000.0
            )),
            ConnectionState::Stopped => Some("disconnected".to_string()),
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected { attempt, .. } => {
                write!(f, "disconnected (attempt {})", attempt)
            }
            ConnectionState::Stopped => write!(f, "stopped"),
        }
    }
}
