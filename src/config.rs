//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chart::{ChartError, ChartResult, ChartSettings, Layout, Margins, TickFill};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub chart: ChartConfig,

    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Real-time channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_host")]
    pub host: String,

    #[serde(default = "default_feed_port")]
    pub port: u16,

    /// Engine.IO endpoint path
    #[serde(default = "default_feed_path")]
    pub path: String,

    /// Socket.IO namespace, always with a leading `/`
    #[serde(
        default = "default_namespace",
        deserialize_with = "deserialize_namespace"
    )]
    pub namespace: String,

    #[serde(default = "default_event")]
    pub event: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// 0 retries forever
    #[serde(default)]
    pub max_reconnect_attempts: u32,
}

fn default_feed_host() -> String {
    "localhost".to_string()
}

fn default_feed_port() -> u16 {
    8081
}

fn default_feed_path() -> String {
    "/socket.io/".to_string()
}

fn default_namespace() -> String {
    "/test1".to_string()
}

fn deserialize_namespace<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|namespace| normalize_namespace(&namespace))
}

/// `test1` and `/test1` name the same namespace; an empty value is the root
pub fn normalize_namespace(namespace: &str) -> String {
    let trimmed = namespace.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn default_event() -> String {
    "newnumber".to_string()
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_initial_backoff() -> u64 {
    1_000
}

fn default_max_backoff() -> u64 {
    30_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: default_feed_host(),
            port: default_feed_port(),
            path: default_feed_path(),
            namespace: default_namespace(),
            event: default_event(),
            connect_timeout_ms: default_connect_timeout(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            max_reconnect_attempts: 0,
        }
    }
}

impl FeedConfig {
    /// WebSocket URL of the Engine.IO endpoint
    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!(
            "ws://{}:{}{}?EIO=4&transport=websocket",
            self.host, self.port, path
        )
    }
}

/// Chart rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    /// Id of the drawing surface
    #[serde(default = "default_element_id")]
    pub element_id: String,

    #[serde(default = "default_width")]
    pub width: f64,

    #[serde(default = "default_height")]
    pub height: f64,

    #[serde(default)]
    pub margins: MarginsConfig,

    #[serde(default = "default_history")]
    pub history_secs: u64,

    #[serde(default = "default_duration")]
    pub duration_ms: u64,

    #[serde(default = "default_time_padding")]
    pub time_padding_ms: i64,

    #[serde(default = "default_headroom")]
    pub headroom: f64,

    #[serde(default)]
    pub tick_fill: TickFill,
}

fn default_element_id() -> String {
    "graph_1".to_string()
}

fn default_width() -> f64 {
    960.0
}

fn default_height() -> f64 {
    500.0
}

fn default_history() -> u64 {
    300 // 5 minutes
}

fn default_duration() -> u64 {
    250
}

fn default_time_padding() -> i64 {
    15_000
}

fn default_headroom() -> f64 {
    1.2
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            element_id: default_element_id(),
            width: default_width(),
            height: default_height(),
            margins: MarginsConfig::default(),
            history_secs: default_history(),
            duration_ms: default_duration(),
            time_padding_ms: default_time_padding(),
            headroom: default_headroom(),
            tick_fill: TickFill::default(),
        }
    }
}

impl ChartConfig {
    /// Validated renderer settings
    pub fn settings(&self) -> ChartResult<ChartSettings> {
        let margins = Margins {
            top: self.margins.top,
            right: self.margins.right,
            bottom: self.margins.bottom,
            left: self.margins.left,
        };

        let settings = ChartSettings {
            element_id: self.element_id.clone(),
            layout: Layout::new(self.width, self.height, margins)?,
            span_ms: history_ms(self.history_secs)?,
            time_padding_ms: self.time_padding_ms,
            headroom: self.headroom,
            duration_ms: self.duration_ms,
            tick_fill: self.tick_fill,
        };
        settings.validate()?;

        Ok(settings)
    }
}

fn history_ms(secs: u64) -> ChartResult<i64> {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| secs.checked_mul(1000))
        .ok_or(ChartError::InvalidSpan(i64::MAX))
}

/// Plot margins in pixels
#[derive(Debug, Clone, Deserialize)]
pub struct MarginsConfig {
    #[serde(default = "default_margin_top")]
    pub top: f64,
    #[serde(default = "default_margin_right")]
    pub right: f64,
    #[serde(default = "default_margin_bottom")]
    pub bottom: f64,
    #[serde(default = "default_margin_left")]
    pub left: f64,
}

fn default_margin_top() -> f64 {
    20.0
}

fn default_margin_right() -> f64 {
    20.0
}

fn default_margin_bottom() -> f64 {
    20.0
}

fn default_margin_left() -> f64 {
    40.0
}

impl Default for MarginsConfig {
    fn default() -> Self {
        Self {
            top: default_margin_top(),
            right: default_margin_right(),
            bottom: default_margin_bottom(),
            left: default_margin_left(),
        }
    }
}

/// Viewer server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_viewer_enabled")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_viewer_enabled() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_max_connections() -> usize {
    100
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            enabled: default_viewer_enabled(),
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

impl ViewerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("stripchart").join("config.toml")),
            Some(PathBuf::from("/etc/stripchart/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Feed overrides
        if let Some(host) = lookup("STRIPCHART_FEED_HOST") {
            self.feed.host = host;
        }
        if let Some(port) = lookup("STRIPCHART_FEED_PORT").and_then(|p| p.parse().ok()) {
            self.feed.port = port;
        }
        if let Some(namespace) = lookup("STRIPCHART_FEED_NAMESPACE") {
            self.feed.namespace = normalize_namespace(&namespace);
        }
        if let Some(event) = lookup("STRIPCHART_FEED_EVENT") {
            self.feed.event = event;
        }

        // Viewer overrides
        if let Some(host) = lookup("STRIPCHART_VIEWER_HOST") {
            self.viewer.host = host;
        }
        if let Some(port) = lookup("STRIPCHART_VIEWER_PORT").and_then(|p| p.parse().ok()) {
            self.viewer.port = port;
        }

        // Logging overrides
        if let Some(level) = lookup("STRIPCHART_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("STRIPCHART_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Stripchart Configuration
#
# Environment variables override these settings:
# - STRIPCHART_FEED_HOST
# - STRIPCHART_FEED_PORT
# - STRIPCHART_FEED_NAMESPACE
# - STRIPCHART_FEED_EVENT
# - STRIPCHART_VIEWER_HOST
# - STRIPCHART_VIEWER_PORT
# - STRIPCHART_LOG_LEVEL
# - STRIPCHART_LOG_FORMAT

[feed]
# Socket.IO server publishing the readings
host = "localhost"
port = 8081
path = "/socket.io/"

# Namespace and event carrying {"number": <value>}
namespace = "/test1"
event = "newnumber"

# Give up on a connection attempt after this long (ms)
connect_timeout_ms = 10000

# Reconnect backoff (ms), doubling from initial up to max
initial_backoff_ms = 1000
max_backoff_ms = 30000

# Reconnect attempts before giving up (0 = never give up)
max_reconnect_attempts = 0

[chart]
# Drawing surface id and declared size (pixels)
element_id = "graph_1"
width = 960
height = 500

# Time kept on screen (seconds)
history_secs = 300

# Tick cadence and slide transition length (ms)
duration_ms = 250

# Empty space after the newest sample on the time axis (ms)
time_padding_ms = 15000

# Value axis top = headroom x largest reading
headroom = 1.2

# Ticks without fresh data: "hold" repeats the last reading, "skip" appends nothing
tick_fill = "hold"

[chart.margins]
top = 20
right = 20
bottom = 20
left = 40

[viewer]
# Serve the chart to browsers
enabled = true
host = "0.0.0.0"
port = 8082

# Maximum concurrent viewer sockets
max_connections = 100

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();

        assert_eq!(config.feed.port, 8081);
        assert_eq!(config.feed.namespace, "/test1");
        assert_eq!(config.feed.event, "newnumber");
        assert_eq!(config.chart.element_id, "graph_1");
        assert_eq!(config.chart.tick_fill, TickFill::Hold);
        assert_eq!(config.chart.margins.left, 40.0);
        assert_eq!(config.viewer.port, 8082);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        let settings = config.chart.settings().unwrap();

        assert_eq!(settings.span_ms, 300_000);
        assert_eq!(settings.duration_ms, 250);
        assert_eq!(settings.layout.inner_width(), 900.0);
        assert_eq!(config.feed.max_reconnect_attempts, 0);
    }

    #[test]
    fn test_feed_url() {
        let config = FeedConfig::default();
        assert_eq!(
            config.url(),
            "ws://localhost:8081/socket.io/?EIO=4&transport=websocket"
        );

        let config = FeedConfig {
            host: "10.0.0.5".to_string(),
            path: "socket.io/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.url(),
            "ws://10.0.0.5:8081/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_invalid_chart_settings() {
        let config = Config::parse("[chart]\nwidth = 10\n").unwrap();
        assert!(config.chart.settings().is_err());

        let config = Config::parse("[chart]\nhistory_secs = 0\n").unwrap();
        assert!(config.chart.settings().is_err());
    }

    #[test]
    fn test_oversized_history_rejected() {
        let config = Config::parse("[chart]\nhistory_secs = 9223372036854775807\n").unwrap();
        assert!(matches!(
            config.chart.settings(),
            Err(ChartError::InvalidSpan(_))
        ));

        let config = Config::parse("[chart]\nhistory_secs = 9223372036854776\n").unwrap();
        assert!(matches!(
            config.chart.settings(),
            Err(ChartError::InvalidSpan(_))
        ));

        let config = Config::parse("[chart]\nhistory_secs = 3600\n").unwrap();
        assert_eq!(config.chart.settings().unwrap().span_ms, 3_600_000);
    }

    #[test]
    fn test_namespace_gets_leading_slash() {
        let config = Config::parse("[feed]\nnamespace = \"test1\"\n").unwrap();
        assert_eq!(config.feed.namespace, "/test1");

        let config = Config::parse("[feed]\nnamespace = \"\"\n").unwrap();
        assert_eq!(config.feed.namespace, "/");

        let env: HashMap<&str, &str> = [("STRIPCHART_FEED_NAMESPACE", "sensors")]
            .into_iter()
            .collect();
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.feed.namespace, "/sensors");

        assert_eq!(normalize_namespace("/test1"), "/test1");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("STRIPCHART_FEED_HOST", "sensors.local"),
            ("STRIPCHART_FEED_PORT", "9000"),
            ("STRIPCHART_VIEWER_PORT", "not-a-port"),
            ("STRIPCHART_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.feed.host, "sensors.local");
        assert_eq!(config.feed.port, 9000);
        assert_eq!(config.viewer.port, 8082);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[feed]\nport = 5000\n\n[chart]\ntick_fill = \"skip\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.feed.port, 5000);
        assert_eq!(config.chart.tick_fill, TickFill::Skip);
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/stripchart.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[feed\nport = ").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }
}
