//! Feed Client
//!
//! Connects to the Socket.IO endpoint, joins the configured namespace and
//! forwards every reading of the configured event to the chart. Lost
//! connections are retried with exponential backoff; every transition is
//! published as a [`ConnectionState`].

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

use super::backoff::Backoff;
use super::error::{FeedError, FeedResult};
use super::event::{parse_reading, FeedEvent};
use super::packet::{EnginePacket, SocketPacket, SocketPacketKind};
use super::state::ConnectionState;
use crate::config::FeedConfig;
use crate::shutdown::wait_for_shutdown;

/// Why a session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Shutdown requested, or nobody is listening any more
    Shutdown,
    /// Server went away cleanly
    Closed,
}

/// Socket.IO subscriber for a single event
pub struct FeedClient {
    config: FeedConfig,
}

impl FeedClient {
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Keep a session alive until shutdown or until reconnects run out
    ///
    /// Publishes `Stopped` on exit.
    pub async fn run(
        self,
        events: mpsc::Sender<FeedEvent>,
        state: watch::Sender<ConnectionState>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let url = self.config.url();
        let mut backoff = Backoff::new(
            Duration::from_millis(self.config.initial_backoff_ms),
            Duration::from_millis(self.config.max_backoff_ms),
            self.config.max_reconnect_attempts,
        );

        tracing::info!(
            url = %url,
            namespace = %self.config.namespace,
            event = %self.config.event,
            "Starting feed client"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let _ = state.send(ConnectionState::Connecting);

            match self
                .session(&url, &events, &state, &mut backoff, &mut shutdown)
                .await
            {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Closed) => {
                    tracing::warn!(url = %url, "Feed connection closed by server");
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Feed connection failed");
                }
            }

            let Some(delay) = backoff.next_delay() else {
                tracing::error!(
                    attempts = backoff.attempts(),
                    "Giving up on feed after {} reconnect attempts",
                    backoff.attempts()
                );
                break;
            };

            let _ = state.send(ConnectionState::Disconnected {
                attempt: backoff.attempts(),
                retry_in_ms: delay.as_millis() as u64,
            });
            tracing::info!(
                attempt = backoff.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to feed"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        let _ = state.send(ConnectionState::Stopped);
        tracing::info!("Feed client stopped");
    }

    /// One WebSocket session: open, handshake, join, read until it ends
    async fn session(
        &self,
        url: &str,
        events: &mpsc::Sender<FeedEvent>,
        state: &watch::Sender<ConnectionState>,
        backoff: &mut Backoff,
        shutdown: &mut watch::Receiver<bool>,
    ) -> FeedResult<SessionEnd> {
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let connected = tokio::select! {
            result = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url)) => result,
            _ = wait_for_shutdown(shutdown) => return Ok(SessionEnd::Shutdown),
        };

        let (stream, _) = match connected {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                return Err(FeedError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(FeedError::Connect {
                    url: url.to_string(),
                    reason: format!("timed out after {} ms", self.config.connect_timeout_ms),
                })
            }
        };

        tracing::debug!(url = %url, "Feed socket open");
        let (mut write, mut read) = stream.split();

        // Until the handshake tells us the ping cadence
        let mut idle_limit = connect_timeout;

        loop {
            let next = tokio::select! {
                next = tokio::time::timeout(idle_limit, read.next()) => next,
                _ = wait_for_shutdown(shutdown) => {
                    let leave = EnginePacket::Message(SocketPacket::disconnect(&self.config.namespace));
                    let _ = write.send(Message::Text(leave.encode())).await;
                    let _ = write.close().await;
                    return Ok(SessionEnd::Shutdown);
                }
            };

            let message = match next {
                Err(_) => return Err(FeedError::Timeout(idle_limit.as_millis() as u64)),
                Ok(None) => return Ok(SessionEnd::Closed),
                Ok(Some(result)) => result?,
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => return Ok(SessionEnd::Closed),
                _ => continue,
            };

            let packet = match EnginePacket::decode(&text) {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring malformed packet");
                    continue;
                }
            };

            match packet {
                EnginePacket::Open(handshake) => {
                    idle_limit =
                        Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);
                    tracing::debug!(
                        sid = %handshake.sid,
                        ping_interval = handshake.ping_interval,
                        "Engine.IO session open"
                    );

                    let join = EnginePacket::Message(SocketPacket::connect(&self.config.namespace));
                    write.send(Message::Text(join.encode())).await?;
                }
                EnginePacket::Ping(data) => {
                    write
                        .send(Message::Text(EnginePacket::Pong(data).encode()))
                        .await?;
                }
                EnginePacket::Close => return Ok(SessionEnd::Closed),
                EnginePacket::Message(packet) => {
                    if let Some(end) = self.handle_packet(packet, events, state, backoff).await? {
                        return Ok(end);
                    }
                }
                EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
            }
        }
    }

    /// React to one Socket.IO packet; `Some` ends the session
    async fn handle_packet(
        &self,
        packet: SocketPacket,
        events: &mpsc::Sender<FeedEvent>,
        state: &watch::Sender<ConnectionState>,
        backoff: &mut Backoff,
    ) -> FeedResult<Option<SessionEnd>> {
        if packet.namespace != self.config.namespace {
            tracing::debug!(namespace = %packet.namespace, "Ignoring packet for other namespace");
            return Ok(None);
        }

        match packet.kind {
            SocketPacketKind::Connect => {
                backoff.reset();
                let _ = state.send(ConnectionState::Connected);
                tracing::info!(namespace = %packet.namespace, "Joined feed namespace");
            }
            SocketPacketKind::Event => {
                let Some((name, args)) = packet.as_event() else {
                    tracing::warn!("Ignoring event packet without a name");
                    return Ok(None);
                };

                if name != self.config.event {
                    tracing::debug!(event = %name, "Ignoring unsubscribed event");
                    return Ok(None);
                }

                match parse_reading(args) {
                    Ok(value) => {
                        let received_at = Utc::now().timestamp_millis();
                        tracing::info!(value, received_at, "Reading received");

                        let event = FeedEvent::Reading { value, received_at };
                        if events.send(event).await.is_err() {
                            tracing::debug!("Chart gone, ending feed session");
                            return Ok(Some(SessionEnd::Shutdown));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping malformed reading");
                    }
                }
            }
            SocketPacketKind::Disconnect => return Ok(Some(SessionEnd::Closed)),
            SocketPacketKind::ConnectError => {
                return Err(FeedError::Rejected {
                    namespace: packet.namespace.clone(),
                    message: packet.error_message(),
                })
            }
            SocketPacketKind::Ack => {}
        }

        Ok(None)
    }
}
