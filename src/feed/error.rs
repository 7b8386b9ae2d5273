//! Feed error types

use thiserror::Error;

/// Errors raised by the feed connection
#[derive(Error, Debug)]
pub enum FeedError {
    /// Could not open the WebSocket
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// WebSocket failed mid-session
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Frame did not follow the Engine.IO / Socket.IO format
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Event arrived without a usable reading
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Server refused the namespace
    #[error("Namespace {namespace} rejected: {message}")]
    Rejected { namespace: String, message: String },

    /// Nothing heard within the ping window
    #[error("No traffic from server for {0} ms")]
    Timeout(u64),
}

/// Result type alias for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeedError::Rejected {
            namespace: "/test1".to_string(),
            message: "Not authorized".to_string(),
        };
        assert_eq!(err.to_string(), "Namespace /test1 rejected: Not authorized");

        let err = FeedError::Timeout(45_000);
        assert_eq!(err.to_string(), "No traffic from server for 45000 ms");
    }
}
