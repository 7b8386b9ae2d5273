//! Chart Service
//!
//! Runs a [`LiveChart`] as a background task. Readings and connection
//! changes arrive over channels; an interval drives the ticks. Each frame is
//! published on a watch channel for HTTP readers and broadcast to viewer
//! sockets.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use super::error::ChartResult;
use super::renderer::LiveChart;
use super::types::{Frame, WindowSnapshot};
use crate::feed::{ConnectionState, FeedEvent};
use crate::shutdown::wait_for_shutdown;
use crate::websocket::{ConnectionHub, WsEvent};

/// Owner of the chart state
pub struct ChartService {
    chart: LiveChart,
    hub: Arc<ConnectionHub>,
    frames: watch::Sender<Arc<Frame>>,
    snapshots: watch::Sender<Arc<WindowSnapshot>>,
}

/// Read side of a running [`ChartService`]
#[derive(Clone)]
pub struct ChartView {
    frames: watch::Receiver<Arc<Frame>>,
    snapshots: watch::Receiver<Arc<WindowSnapshot>>,
}

impl ChartView {
    /// Most recently rendered frame
    pub fn latest_frame(&self) -> Arc<Frame> {
        Arc::clone(&self.frames.borrow())
    }

    /// Window as of the latest frame
    pub fn snapshot(&self) -> Arc<WindowSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// A tick has been rendered since start
    pub fn has_ticked(&self) -> bool {
        self.frames.borrow().sequence > 0
    }

    /// Receiver that wakes on every new frame
    pub fn frames(&self) -> watch::Receiver<Arc<Frame>> {
        self.frames.clone()
    }
}

impl ChartService {
    /// Wrap `chart`, publishing its initial render as frame 0
    pub fn new(chart: LiveChart, hub: Arc<ConnectionHub>) -> ChartResult<(Self, ChartView)> {
        let initial = chart.render(Utc::now().timestamp_millis())?;
        let (frames, frames_rx) = watch::channel(Arc::new(initial));
        let (snapshots, snapshots_rx) = watch::channel(Arc::new(chart.snapshot()));

        let service = Self {
            chart,
            hub,
            frames,
            snapshots,
        };
        let view = ChartView {
            frames: frames_rx,
            snapshots: snapshots_rx,
        };

        Ok((service, view))
    }

    /// Tick until shutdown
    ///
    /// Keeps scrolling after the feed gives up; the last reading is held.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<FeedEvent>,
        mut connection: watch::Receiver<ConnectionState>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let period = Duration::from_millis(self.chart.settings().duration_ms);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let initial = connection.borrow_and_update().clone();
        self.apply_connection_state(&initial).await;

        let mut feed_open = true;
        let mut connection_open = true;

        tracing::info!(
            duration_ms = period.as_millis() as u64,
            span_ms = self.chart.settings().span_ms,
            tick_fill = ?self.chart.settings().tick_fill,
            "Chart service started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                event = events.recv(), if feed_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        tracing::info!("Feed channel closed, holding last reading");
                        feed_open = false;
                    }
                },
                changed = connection.changed(), if connection_open => {
                    if changed.is_err() {
                        connection_open = false;
                        continue;
                    }
                    let state = connection.borrow_and_update().clone();
                    self.apply_connection_state(&state).await;
                }
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        tracing::info!(sequence = self.chart.sequence(), "Chart service stopped");
    }

    fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Reading { value, received_at } => {
                self.chart.receive_value_at(value, received_at);
            }
        }
    }

    async fn tick(&mut self) {
        let frame = match self.chart.tick() {
            Ok(frame) => Arc::new(frame),
            Err(e) => {
                tracing::warn!(error = %e, sequence = self.chart.sequence(), "Frame skipped");
                return;
            }
        };

        self.snapshots.send_replace(Arc::new(self.chart.snapshot()));
        self.frames.send_replace(Arc::clone(&frame));
        self.hub.broadcast(&WsEvent::frame(&frame)).await;
    }

    async fn apply_connection_state(&mut self, state: &ConnectionState) {
        tracing::info!(state = %state, "Feed connection state changed");

        self.chart.set_status(state.label());
        self.hub.broadcast(&WsEvent::status(state)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartSettings;
    use crate::websocket::{HubConfig, ServerMessage};

    fn service() -> (ChartService, ChartView, Arc<ConnectionHub>) {
        let settings = ChartSettings {
            duration_ms: 10,
            ..Default::default()
        };
        let chart = LiveChart::new(settings, Utc::now().timestamp_millis()).unwrap();
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (service, view) = ChartService::new(chart, Arc::clone(&hub)).unwrap();
        (service, view, hub)
    }

    #[tokio::test]
    async fn test_initial_frame_published() {
        let (_service, view, _hub) = service();

        let frame = view.latest_frame();
        assert_eq!(frame.sequence, 0);
        assert_eq!(frame.sample_count, 2);
        assert!(!view.has_ticked());
    }

    #[tokio::test]
    async fn test_ticks_publish_frames_and_readings_flow() {
        let (service, view, _hub) = service();
        let (events_tx, events_rx) = mpsc::channel(8);
        let (_state_tx, state_rx) = watch::channel(ConnectionState::Connected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(service.run(events_rx, state_rx, shutdown_rx));

        events_tx
            .send(FeedEvent::Reading {
                value: 42.0,
                received_at: Utc::now().timestamp_millis(),
            })
            .await
            .unwrap();

        let mut frames = view.frames();
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(1), frames.changed())
                .await
                .unwrap()
                .unwrap();
        }

        let snapshot = view.snapshot();
        assert_eq!(snapshot.current_reading, 42.0);
        assert!(snapshot.value_domain.1 >= 42.0 * 1.2 - 1e-9);
        assert!(view.has_ticked());
        assert!(view.latest_frame().status.is_none());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_connection_state_drawn_and_broadcast() {
        let (service, view, hub) = service();
        let mut viewer = hub.register().await.unwrap();
        hub.subscribe(&viewer.id, vec!["status".to_string()]).await.unwrap();

        let (_events_tx, events_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(service.run(events_rx, state_rx, shutdown_rx));

        let first = tokio::time::timeout(Duration::from_secs(1), viewer.inbox.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            first,
            ServerMessage::Status {
                connection: ConnectionState::Connecting
            }
        ));

        state_tx.send(ConnectionState::Stopped).unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), viewer.inbox.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            second,
            ServerMessage::Status {
                connection: ConnectionState::Stopped
            }
        ));

        // The label shows up on the next rendered frame
        let mut frames = view.frames();
        tokio::time::timeout(Duration::from_secs(1), frames.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.latest_frame().status.as_deref(), Some("disconnected"));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_keeps_ticking_after_feed_ends() {
        let (service, view, _hub) = service();
        let (events_tx, events_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(service.run(events_rx, state_rx, shutdown_rx));
        drop(events_tx);
        drop(state_tx);

        let mut frames = view.frames();
        let before = view.latest_frame().sequence;
        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(1), frames.changed())
                .await
                .unwrap()
                .unwrap();
        }
        assert!(view.latest_frame().sequence > before);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
