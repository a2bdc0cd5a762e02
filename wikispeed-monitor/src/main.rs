// Wikispeed Monitor - Prometheus exporter for live edit rates
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Wikispeed Monitor
//!
//! Reads a recent-change feed, keeps a live rate gauge per channel and
//! exports the readings as Prometheus metrics and a JSON status board.
//!
//! ## Usage
//!
//! ```bash
//! # Follow the live Wikimedia stream
//! curl -sN https://stream.wikimedia.org/v2/stream/recentchange | wikispeed-monitor
//!
//! # Replay a captured feed with a custom board
//! wikispeed-monitor --input capture.jsonl --config board.json --port 9090
//! ```

mod board;
mod driver;
mod error;
mod feed;
mod metrics;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use clap::Parser;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use wikispeed::{SystemClock, WikispeedConfig};

use board::{BoardSnapshot, GaugeBoard, SharedBoard};
use driver::{Driver, Shutdown};
use error::MonitorError;
use metrics::encode_metrics;

/// Events buffered between the feed reader and the driver.
const FEED_BUFFER: usize = 1024;

/// Wikispeed Prometheus Exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Board configuration (JSON); the stock Wikimedia board if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Feed file to read; stdin if omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "9100")]
    port: u16,

    /// Tick interval in milliseconds (overrides the configuration)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Application state shared across handlers.
struct AppState {
    board: SharedBoard,
    start_time: std::time::Instant,
}

#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Wikispeed Monitor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => WikispeedConfig::from_file(path)?,
        None => {
            info!("No configuration specified, using the stock board");
            WikispeedConfig::default()
        }
    };
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    config.validate()?;

    let session = config.build_session()?;
    let board = GaugeBoard::new(session.registry());
    let shared = board.shared();
    info!(
        "Board ready: {} channels, {}s window, {}ms tick",
        session.registry().len(),
        session.window_secs(),
        config.tick_interval_ms
    );

    let reader = feed::open_input(args.input.as_deref()).await?;
    let shutdown = Shutdown::new();
    let (tx, rx) = mpsc::channel(FEED_BUFFER);

    let feed_task = tokio::spawn(feed::run_feed(reader, tx, shutdown.subscribe()));

    let tick_interval = Duration::from_millis(config.tick_interval_ms.max(1));
    let driver = Driver::new(session, board, SystemClock, tick_interval);
    let driver_shutdown = shutdown.clone();
    let driver_rx = shutdown.subscribe();
    let driver_task = tokio::spawn(async move {
        let result = driver.run(rx, driver_rx).await;
        // Feed end or a failed start takes the server down too
        driver_shutdown.stop();
        result
    });

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && !ctrl_c.is_stopped() {
            info!("Received Ctrl-C, shutting down");
        }
        ctrl_c.stop();
    });

    // Create app state
    let state = Arc::new(AppState {
        board: shared,
        start_time: std::time::Instant::now(),
    });

    // Build router
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().wait())
        .await?;

    let session = driver_task.await??;
    let summary = feed_task.await?;
    let stats = session.stats();
    info!(
        "Stopped: {} lines read, {} events ({} matched, {} canaries), {} feed errors, {} ticks",
        summary.lines, stats.events, stats.matched, stats.canaries, summary.errors, stats.ticks
    );
    if stats.render_failures > 0 {
        error!("{} display updates failed", stats.render_failures);
    }
    Ok(())
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Wikispeed Monitor</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #2c3e50; }
        a { color: #3498db; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { margin: 10px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>Wikispeed Monitor</h1>
    <p>Live edit rate gauges for a recent-change feed.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div class="endpoint"><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><a href="/health">/health</a> - Health check</div>
        <div class="endpoint"><a href="/status">/status</a> - Gauge board (JSON)</div>
    </div>

    <h2>Metrics</h2>
    <ul>
        <li><code>wikispeed_channel_rate</code> - Current rate per channel</li>
        <li><code>wikispeed_channel_zone</code> - Zone (0=Low, 1=Elevated, 2=High)</li>
        <li><code>wikispeed_channel_capacity</code> - Gauge ceiling per channel</li>
        <li><code>wikispeed_events_total</code> - Events received</li>
        <li><code>wikispeed_feed_errors_total</code> - Undecodable feed lines</li>
        <li><code>wikispeed_render_failures_total</code> - Failed display updates</li>
        <li><code>wikispeed_steady_channels</code> - Channels with a full window</li>
    </ul>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = encode_metrics();
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    board: BoardSnapshot,
}

/// Status handler - returns the gauge board as JSON.
async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let board = state
        .board
        .read()
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?
        .clone();

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        board,
    }))
}
