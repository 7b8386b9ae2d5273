//! WebSocket Message Types
//!
//! Messages exchanged between viewer pages and the chart server.

use serde::{Deserialize, Serialize};

use crate::chart::Frame;
use crate::feed::ConnectionState;

/// Topic carrying rendered frames
pub const FRAMES_TOPIC: &str = "frames";
/// Topic carrying feed connection changes
pub const STATUS_TOPIC: &str = "status";

/// Messages sent from viewer to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics (`frames`, `status`)
    Subscribe { topics: Vec<String> },
    Unsubscribe { topics: Vec<String> },
    /// Keepalive
    Ping,
}

/// Messages sent from server to viewer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A freshly rendered tick
    Frame {
        sequence: u64,
        /// Complete SVG for the drawing surface
        svg: String,
        /// Offset the line starts from before sliding back to 0
        translate_x: f64,
        /// Length of the slide
        duration_ms: u64,
        sample_count: usize,
    },
    /// The feed connection changed
    Status { connection: ConnectionState },
    /// Subscription confirmed
    Subscribed { topics: Vec<String> },
    /// Unsubscription confirmed
    Unsubscribed { topics: Vec<String> },
    /// Pong response to ping
    Pong,
    Error { message: String },
    /// Connection established
    Connected { connection_id: String },
}

impl ServerMessage {
    pub fn frame(frame: &Frame) -> Self {
        ServerMessage::Frame {
            sequence: frame.sequence,
            svg: frame.svg.clone(),
            translate_x: frame.translate_x,
            duration_ms: frame.duration_ms,
            sample_count: frame.sample_count,
        }
    }

    pub fn status(connection: &ConnectionState) -> Self {
        ServerMessage::Status {
            connection: connection.clone(),
        }
    }
}

/// Message routed to the subscribers of one topic
#[derive(Debug, Clone)]
pub struct WsEvent {
    pub topic: &'static str,
    pub message: ServerMessage,
}

impl WsEvent {
    pub fn frame(frame: &Frame) -> Self {
        Self {
            topic: FRAMES_TOPIC,
            message: ServerMessage::frame(frame),
        }
    }

    pub fn status(connection: &ConnectionState) -> Self {
        Self {
            topic: STATUS_TOPIC,
            message: ServerMessage::status(connection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame {
            sequence: 7,
            rendered_at: 1_699_000_000_000,
            svg: "<svg id=\"graph_1\"></svg>".to_string(),
            translate_x: -0.25,
            duration_ms: 250,
            time_domain: (0, 1),
            value_domain: (0.0, 1.2),
            sample_count: 3,
            status: None,
        }
    }

    #[test]
    fn test_client_message_deserialize_subscribe() {
        let json = r#"{"type": "subscribe", "topics": ["frames", "status"]}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe { topics } => {
                assert_eq!(topics, vec!["frames", "status"]);
            }
            _ => panic!("Expected Subscribe"),
        }
    }

    #[test]
    fn test_client_message_deserialize_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_frame_message() {
        let event = WsEvent::frame(&frame());
        assert_eq!(event.topic, "frames");

        let json = serde_json::to_value(&event.message).unwrap();
        assert_eq!(json["type"], "frame");
        assert_eq!(json["sequence"], 7);
        assert_eq!(json["translate_x"], -0.25);
        assert_eq!(json["duration_ms"], 250);
        assert!(json["svg"].as_str().unwrap().contains("graph_1"));
    }

    #[test]
    fn test_status_message() {
        let event = WsEvent::status(&ConnectionState::Disconnected {
            attempt: 2,
            retry_in_ms: 2000,
        });
        assert_eq!(event.topic, "status");

        let json = serde_json::to_string(&event.message).unwrap();
        assert_eq!(
            json,
            r#"{"type":"status","connection":{"state":"disconnected","attempt":2,"retry_in_ms":2000}}"#
        );
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }
}
