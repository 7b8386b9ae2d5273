//! # Stripchart
//!
//! Live scrolling strip chart of a numeric Socket.IO stream.
//!
//! A feed client subscribes to a `newnumber`-style event, a chart service
//! keeps the last five minutes of readings and renders an SVG frame every
//! tick, and a small viewer server streams those frames to browsers.
//!
//! ## Modules
//!
//! - [`chart`]: Sample window, scales, SVG rendering and the tick service
//! - [`feed`]: Socket.IO client with reconnect
//! - [`api`]: Viewer HTTP server with Axum
//! - [`websocket`]: Frame and status streaming to viewer pages
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stripchart::chart::{ChartSettings, LiveChart};
//!
//! let now = chrono::Utc::now().timestamp_millis();
//! let mut chart = LiveChart::new(ChartSettings::default(), now)?;
//!
//! chart.receive_value_at(42.0, now + 100);
//! let frame = chart.tick_at(now + 250)?;
//!
//! assert_eq!(frame.value_domain, (0.0, 42.0 * 1.2));
//! println!("{}", frame.svg);
//! # Ok::<(), stripchart::chart::ChartError>(())
//! ```

pub mod api;
pub mod chart;
pub mod config;
pub mod feed;
pub mod shutdown;
pub mod websocket;

pub use api::{build_router, serve, ApiError, AppState};

pub use chart::{
    ChartError, ChartResult, ChartService, ChartSettings, ChartView, Frame, LiveChart, Sample,
    TickFill, WindowSnapshot,
};

pub use feed::{ConnectionState, FeedClient, FeedError, FeedEvent};

pub use websocket::{ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent};

pub use config::{ChartConfig, Config, ConfigError, FeedConfig, LoggingConfig, ViewerConfig};
