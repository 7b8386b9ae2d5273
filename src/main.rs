//! Stripchart CLI
//!
//! - `run`: connect to the feed, tick the chart and serve the viewer
//! - `config`: print or write the default configuration
//! - `snapshot`: fetch the current frame from a running viewer

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stripchart::api::{self, AppState};
use stripchart::chart::{ChartService, LiveChart};
use stripchart::config::{self, Config, LoggingConfig};
use stripchart::feed::{ConnectionState, FeedClient};
use stripchart::shutdown::shutdown_signal;
use stripchart::websocket::{ConnectionHub, HubConfig};

/// Readings buffered between the feed and the chart
const FEED_CHANNEL_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "stripchart")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live scrolling strip chart of a numeric Socket.IO stream")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the feed and serve the chart (default)
    Run,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Save the current frame of a running viewer as SVG
    Snapshot {
        /// Viewer base URL
        #[arg(long, default_value = "http://localhost:8082")]
        url: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = match &cli.config {
                Some(path) => Config::load_with_env(path)?,
                None => Config::load_default(),
            };
            init_tracing(&config.logging)?;
            run(config).await
        }
        Commands::Config { output } => {
            let content = config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)
                        .with_context(|| format!("writing {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
            Ok(())
        }
        Commands::Snapshot { url, output } => snapshot(&url, output).await,
    }
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("stripchart={}", logging.level)))
        .context("invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }

    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!("Stripchart v{}", env!("CARGO_PKG_VERSION"));

    let settings = config.chart.settings().context("invalid [chart] settings")?;
    let chart = LiveChart::new(settings.clone(), chrono::Utc::now().timestamp_millis())?;

    let hub = Arc::new(ConnectionHub::new(HubConfig {
        max_connections: config.viewer.max_connections,
    }));
    let (service, view) = ChartService::new(chart, Arc::clone(&hub))?;

    let (events_tx, events_rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let (connection_tx, connection_rx) = watch::channel(ConnectionState::Connecting);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let feed = FeedClient::new(config.feed.clone());
    let feed_handle = tokio::spawn(feed.run(events_tx, connection_tx, shutdown_rx.clone()));
    let chart_handle = tokio::spawn(service.run(
        events_rx,
        connection_rx.clone(),
        shutdown_rx.clone(),
    ));

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    if config.viewer.enabled {
        let state = AppState::new(settings, config.feed.clone(), hub, view, connection_rx);
        api::serve(state, &config.viewer, shutdown_rx).await?;
    } else {
        tracing::info!("Viewer disabled, rendering headless");
        let mut shutdown = shutdown_rx;
        stripchart::shutdown::wait_for_shutdown(&mut shutdown).await;
    }

    feed_handle.await.context("feed task panicked")?;
    chart_handle.await.context("chart task panicked")?;

    tracing::info!("Stripchart shutdown complete");
    Ok(())
}

async fn snapshot(url: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    let endpoint = format!("{}/chart.svg", url.trim_end_matches('/'));

    let response = reqwest::Client::new()
        .get(&endpoint)
        .send()
        .await
        .with_context(|| format!("fetching {}", endpoint))?
        .error_for_status()?;
    let svg = response.text().await?;

    match output {
        Some(path) => {
            std::fs::write(&path, &svg).with_context(|| format!("writing {:?}", path))?;
            println!("Snapshot written to {:?}", path);
        }
        None => println!("{}", svg),
    }

    Ok(())
}
