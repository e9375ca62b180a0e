//! # relay-runner
//!
//! Main entry point for the market-data relay.
//!
//! Loads a JSON configuration file, opens the shared RabbitMQ publisher, and
//! serves the HTTP control surface that starts and stops exchange streams.
//! No stream runs until it is started through the control surface.
//!
//! # Usage
//!
//! ```bash
//! relay-runner config.json --log-level info
//! curl http://127.0.0.1:8080/start/upbit/trade
//! ```

mod control;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use relay_md::StreamRegistry;
use relay_mq::{AmqpPublisher, Publisher};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::control::ControlState;

/// How long shutdown waits for each session task to exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Exchange WebSocket to RabbitMQ relay.
#[derive(Parser)]
#[command(name = "relay-runner", about = "Exchange WebSocket to RabbitMQ market-data relay")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output (overrides `logging.log_path`).
    #[arg(long)]
    log_dir: Option<String>,

    /// Emit console logs as JSON.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration (file + environment overrides)
    let config = relay_core::config::load_config(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    relay_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name(), cli.log_json);

    info!(
        "relay-runner starting: config={}, log_level={}, {} exchange(s) configured",
        cli.config.display(),
        cli.log_level,
        config.exchanges.len()
    );

    // 3. Shared broker publisher. A failed first connect is not fatal:
    //    sessions re-dial through ensure_connected.
    let publisher = Arc::new(AmqpPublisher::new(&config.rabbit));
    if let Err(e) = publisher.ensure_connected().await {
        warn!("initial broker connection failed, streams will retry: {e}");
    }
    let publisher: Arc<dyn Publisher> = publisher;

    // 4. Registry + control surface
    let bind_addr = config.http.bind_addr();
    let registry = Arc::new(StreamRegistry::new(Arc::new(config), Arc::clone(&publisher)));
    let state = Arc::new(ControlState { registry: Arc::clone(&registry), publisher: Arc::clone(&publisher) });

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding control surface on {bind_addr}"))?;
    info!("control surface listening on {bind_addr}");

    let cancel = CancellationToken::new();
    tokio::spawn(watch_signals(cancel.clone()));

    let shutdown = cancel.clone();
    if let Err(e) = axum::serve(listener, control::router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        error!("control surface error: {e}");
    }

    // 5. Stop every stream, then release the broker link
    info!("shutting down");
    registry.shutdown(SHUTDOWN_GRACE).await;
    publisher.close().await;

    info!("relay-runner stopped");
    Ok(())
}

/// Cancel `cancel` on Ctrl+C or SIGTERM.
async fn watch_signals(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received"),
        _ = terminate => info!("SIGTERM received"),
    }
    cancel.cancel();
}
