//! Viewer Socket Handler
//!
//! One loop per viewer: status messages and the newest frame are written
//! out, and client messages are answered, until either side goes away.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

use super::hub::ViewerChannels;
use super::messages::{ClientMessage, ServerMessage, FRAMES_TOPIC, STATUS_TOPIC};
use crate::api::AppState;

/// GET /ws
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| viewer_session(socket, state))
}

fn to_text(message: &ServerMessage) -> Option<Message> {
    serde_json::to_string(message)
        .map(Message::Text)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to serialize viewer message");
        })
        .ok()
}

async fn viewer_session(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();

    let ViewerChannels {
        id,
        mut inbox,
        mut frames,
    } = match state.ws_hub.register().await {
        Ok(channels) => channels,
        Err(e) => {
            tracing::warn!(error = %e, "Refusing viewer");
            let refusal = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Some(text) = to_text(&refusal) {
                let _ = sink.send(text).await;
            }
            let _ = sink.close().await;
            return;
        }
    };

    let mut pending = vec![ServerMessage::Connected {
        connection_id: id.clone(),
    }];

    'session: loop {
        for message in pending.drain(..) {
            let Some(text) = to_text(&message) else {
                continue;
            };
            if sink.send(text).await.is_err() {
                tracing::debug!(connection_id = %id, "Viewer write failed");
                break 'session;
            }
        }

        tokio::select! {
            queued = inbox.recv() => match queued {
                Some(message) => pending.push(message),
                None => break,
            },
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(frame) = frames.borrow_and_update().clone() {
                    pending.push(frame);
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    pending.extend(answer(&state, &id, &text).await);
                }
                Some(Ok(Message::Binary(_))) => pending.push(ServerMessage::Error {
                    message: "Binary messages not supported".to_string(),
                }),
                // axum answers pings itself
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %id, error = %e, "Viewer read failed");
                    break;
                }
            },
        }
    }

    state.ws_hub.unregister(&id).await;
}

/// Replies to one text message from a viewer
async fn answer(state: &AppState, id: &str, text: &str) -> Vec<ServerMessage> {
    let request = match serde_json::from_str::<ClientMessage>(text) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(connection_id = %id, error = %e, "Invalid viewer message");
            return vec![ServerMessage::Error {
                message: format!("Invalid message format: {}", e),
            }];
        }
    };

    let hub = &state.ws_hub;
    match request {
        ClientMessage::Subscribe { topics } => match hub.subscribe(id, topics).await {
            Ok(accepted) => {
                // Followers start from the current picture
                let catch_up = accepted.iter().filter_map(|topic| match topic.as_str() {
                    FRAMES_TOPIC => Some(ServerMessage::frame(&state.chart.latest_frame())),
                    STATUS_TOPIC => Some(ServerMessage::status(&state.connection_state())),
                    _ => None,
                });
                let catch_up: Vec<ServerMessage> = catch_up.collect();

                let mut replies = vec![ServerMessage::Subscribed { topics: accepted }];
                replies.extend(catch_up);
                replies
            }
            Err(e) => vec![ServerMessage::Error {
                message: e.to_string(),
            }],
        },
        ClientMessage::Unsubscribe { topics } => match hub.unsubscribe(id, topics).await {
            Ok(removed) => vec![ServerMessage::Unsubscribed { topics: removed }],
            Err(e) => vec![ServerMessage::Error {
                message: e.to_string(),
            }],
        },
        ClientMessage::Ping => vec![ServerMessage::Pong],
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, watch};
    use tokio_tungstenite::tungstenite::Message as ClientFrame;

    use crate::api::{build_router, AppState};
    use crate::chart::{ChartService, ChartSettings, LiveChart};
    use crate::config::FeedConfig;
    use crate::feed::ConnectionState;
    use crate::websocket::{ConnectionHub, HubConfig};

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn next_json(client: &mut Client) -> serde_json::Value {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let ClientFrame::Text(text) = message {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    /// Read until a message of type `kind` arrives
    async fn next_of_type(client: &mut Client, kind: &str) -> serde_json::Value {
        loop {
            let json = next_json(client).await;
            if json["type"] == kind {
                return json;
            }
        }
    }

    async fn send_text(client: &mut Client, text: &str) {
        client.send(ClientFrame::Text(text.to_string())).await.unwrap();
    }

    #[tokio::test]
    async fn test_viewer_receives_catch_up_and_live_frames() {
        let settings = ChartSettings {
            duration_ms: 20,
            ..Default::default()
        };
        let chart =
            LiveChart::new(settings.clone(), chrono::Utc::now().timestamp_millis()).unwrap();
        let hub = Arc::new(ConnectionHub::new(HubConfig { max_connections: 1 }));
        let (service, view) = ChartService::new(chart, Arc::clone(&hub)).unwrap();

        let (_events_tx, events_rx) = mpsc::channel(8);
        let (connection_tx, connection_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(service.run(events_rx, connection_rx.clone(), shutdown_rx));

        let state = AppState::new(settings, FeedConfig::default(), hub, view, connection_rx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        let url = format!("ws://{}/ws", addr);
        let (mut client, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

        let connected = next_json(&mut client).await;
        assert_eq!(connected["type"], "connected");
        assert!(connected["connection_id"].is_string());

        send_text(
            &mut client,
            r#"{"type":"subscribe","topics":["frames","status","nope"]}"#,
        )
        .await;

        let subscribed = next_of_type(&mut client, "subscribed").await;
        assert_eq!(subscribed["topics"], serde_json::json!(["frames", "status"]));

        let status = next_of_type(&mut client, "status").await;
        assert_eq!(status["connection"]["state"], "connecting");

        let frame = next_of_type(&mut client, "frame").await;
        assert!(frame["svg"].as_str().unwrap().contains(r#"id="graph_1""#));
        assert_eq!(frame["duration_ms"], 20);

        // Live frames keep coming with rising sequence numbers
        let first = next_of_type(&mut client, "frame").await["sequence"]
            .as_u64()
            .unwrap();
        let second = next_of_type(&mut client, "frame").await["sequence"]
            .as_u64()
            .unwrap();
        assert!(second > first);

        connection_tx.send(ConnectionState::Connected).unwrap();
        let status = next_of_type(&mut client, "status").await;
        assert_eq!(status["connection"]["state"], "connected");

        send_text(&mut client, r#"{"type":"ping"}"#).await;
        next_of_type(&mut client, "pong").await;

        send_text(&mut client, "not json").await;
        let error = next_of_type(&mut client, "error").await;
        assert!(error["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid message format"));

        // The hub is full: a second viewer is refused
        let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
        let refusal = next_json(&mut second).await;
        assert_eq!(refusal["type"], "error");
        assert!(refusal["message"]
            .as_str()
            .unwrap()
            .contains("Too many viewers"));

        shutdown_tx.send(true).unwrap();
    }
}
