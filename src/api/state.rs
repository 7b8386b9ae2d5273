//! Application State
//!
//! Shared state accessible by all viewer handlers.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::chart::{ChartSettings, ChartView};
use crate::config::FeedConfig;
use crate::feed::ConnectionState;
use crate::websocket::ConnectionHub;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Chart the frames come from
    pub settings: Arc<ChartSettings>,
    /// Feed the readings come from
    pub feed: Arc<FeedConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// Viewer sockets
    pub ws_hub: Arc<ConnectionHub>,
    /// Latest frame and window
    pub chart: ChartView,
    /// Feed connection state
    pub connection: watch::Receiver<ConnectionState>,
}

impl AppState {
    pub fn new(
        settings: ChartSettings,
        feed: FeedConfig,
        ws_hub: Arc<ConnectionHub>,
        chart: ChartView,
        connection: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            feed: Arc::new(feed),
            start_time: Instant::now(),
            ws_hub,
            chart,
            connection,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.borrow().clone()
    }

    /// At least one tick has been rendered
    pub fn is_ready(&self) -> bool {
        self.chart.has_ticked()
    }

    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}
