//! Viewer Hub
//!
//! Registry of attached viewers and the topics each one follows. Frames and
//! status changes are fanned out to every viewer following their topic.

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

use super::messages::{ServerMessage, WsEvent, FRAMES_TOPIC, STATUS_TOPIC};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Status messages a viewer may have queued before further ones are dropped
pub const OUTBOX_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent viewers
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
        }
    }
}

/// Receiving side handed to a viewer session on registration
pub struct ViewerChannels {
    pub id: ConnectionId,
    /// Status messages, in order
    pub inbox: mpsc::Receiver<ServerMessage>,
    /// Newest frame only; a slow viewer skips the ones it missed
    pub frames: watch::Receiver<Option<ServerMessage>>,
}

/// One attached viewer
struct Viewer {
    outbox: mpsc::Sender<ServerMessage>,
    latest_frame: watch::Sender<Option<ServerMessage>>,
    topics: HashSet<&'static str>,
}

impl Viewer {
    /// Queue `event`, returning whether the viewer can still receive it
    fn deliver(&self, id: &str, event: &WsEvent) -> bool {
        if event.topic == FRAMES_TOPIC {
            return self.latest_frame.send(Some(event.message.clone())).is_ok();
        }

        match self.outbox.try_send(event.message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %id, topic = event.topic, "Viewer lagging, message dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Registry of viewer connections
pub struct ConnectionHub {
    viewers: RwLock<HashMap<ConnectionId, Viewer>>,
    config: HubConfig,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Attach a viewer, returning the channels its messages arrive on
    pub async fn register(&self) -> Result<ViewerChannels, HubError> {
        let mut viewers = self.viewers.write().await;
        if viewers.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        let (outbox, inbox) = mpsc::channel(OUTBOX_CAPACITY);
        let (latest_frame, frames) = watch::channel(None);
        viewers.insert(
            id.clone(),
            Viewer {
                outbox,
                latest_frame,
                topics: HashSet::new(),
            },
        );

        tracing::info!(connection_id = %id, viewers = viewers.len(), "Viewer attached");
        Ok(ViewerChannels { id, inbox, frames })
    }

    /// Detach a viewer; its subscriptions go with it
    pub async fn unregister(&self, id: &str) {
        if self.viewers.write().await.remove(id).is_some() {
            tracing::info!(connection_id = %id, "Viewer detached");
        }
    }

    /// Follow `topics`, returning the ones recognised
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut viewers = self.viewers.write().await;
        let viewer = viewers.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut accepted = Vec::with_capacity(topics.len());
        for topic in topics {
            match known_topic(&topic) {
                Some(known) => {
                    viewer.topics.insert(known);
                    accepted.push(topic);
                }
                None => tracing::warn!(connection_id = %id, topic = %topic, "Unknown topic ignored"),
            }
        }

        tracing::debug!(connection_id = %id, topics = ?accepted, "Viewer subscribed");
        Ok(accepted)
    }

    /// Stop following `topics`, returning the ones that were followed
    pub async fn unsubscribe(
        &self,
        id: &str,
        topics: Vec<String>,
    ) -> Result<Vec<String>, HubError> {
        let mut viewers = self.viewers.write().await;
        let viewer = viewers.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let removed: Vec<String> = topics
            .into_iter()
            .filter(|topic| viewer.topics.remove(topic.as_str()))
            .collect();

        tracing::debug!(connection_id = %id, topics = ?removed, "Viewer unsubscribed");
        Ok(removed)
    }

    /// Hand `event` to every viewer following its topic
    ///
    /// Frames overwrite the previous undelivered one. Returns how many
    /// viewers took the event.
    pub async fn broadcast(&self, event: &WsEvent) -> usize {
        let viewers = self.viewers.read().await;

        let reached = viewers
            .iter()
            .filter(|(_, viewer)| viewer.topics.contains(event.topic))
            .filter(|(id, viewer)| viewer.deliver(id, event))
            .count();

        if reached > 0 {
            tracing::trace!(topic = event.topic, viewers = reached, "Event fanned out");
        }
        reached
    }

    pub async fn connection_count(&self) -> usize {
        self.viewers.read().await.len()
    }

    /// Number of viewers following `topic`
    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.viewers
            .read()
            .await
            .values()
            .filter(|viewer| viewer.topics.contains(topic))
            .count()
    }
}

fn known_topic(topic: &str) -> Option<&'static str> {
    match topic {
        FRAMES_TOPIC => Some(FRAMES_TOPIC),
        STATUS_TOPIC => Some(STATUS_TOPIC),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many viewers (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,
}
