//! HTTP control surface.
//!
//! | Route                              | Action                        |
//! |------------------------------------|-------------------------------|
//! | `GET /start/{platform}/{dataType}` | start a stream (idempotent)   |
//! | `GET /stop/{platform}/{dataType}`  | stop a stream                 |
//! | `GET /streams`                     | JSON status of every stream   |
//! | `GET /health`                      | broker link status            |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use relay_core::StreamKey;
use relay_core::error::RelayError;
use relay_md::{StartOutcome, StopOutcome, StreamRegistry, StreamStatus};
use relay_mq::Publisher;
use tracing::{error, info, warn};

/// Shared state behind every handler.
pub struct ControlState {
    pub registry: Arc<StreamRegistry>,
    pub publisher: Arc<dyn Publisher>,
}

pub fn router(state: Arc<ControlState>) -> Router {
    Router::new()
        .route("/start/{platform}/{data_type}", get(start_stream))
        .route("/stop/{platform}/{data_type}", get(stop_stream))
        .route("/streams", get(list_streams))
        .route("/health", get(health))
        .with_state(state)
}

async fn start_stream(
    State(state): State<Arc<ControlState>>,
    Path((platform, data_type)): Path<(String, String)>,
) -> (StatusCode, String) {
    let key = match StreamKey::parse(&platform, &data_type) {
        Ok(key) => key,
        Err(e) => {
            warn!("[control] rejected start {platform}/{data_type}: {e}");
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match state.registry.start(key) {
        Ok(StartOutcome::Started) => {
            info!("[control] stream {key} started");
            (StatusCode::OK, format!("Stream for platform {} with dataType {} started successfully", key.platform, key.kind))
        }
        Ok(StartOutcome::AlreadyRunning) => {
            (StatusCode::OK, format!("Stream for platform {} with dataType {} is already started", key.platform, key.kind))
        }
        Err(RelayError::ShutDown) => {
            (StatusCode::SERVICE_UNAVAILABLE, format!("Cannot start stream {key}: relay is shutting down"))
        }
        Err(e) => {
            error!("[control] failed to start {key}: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to start stream {key}: {e}"))
        }
    }
}

async fn stop_stream(
    State(state): State<Arc<ControlState>>,
    Path((platform, data_type)): Path<(String, String)>,
) -> (StatusCode, String) {
    let key = match StreamKey::parse(&platform, &data_type) {
        Ok(key) => key,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.registry.stop(key) {
        StopOutcome::Stopped => {
            (StatusCode::OK, format!("Stream for platform {} with dataType {} stopped successfully", key.platform, key.kind))
        }
        StopOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            format!("Stream for platform {} with dataType {} not found or already stopped", key.platform, key.kind),
        ),
    }
}

async fn list_streams(State(state): State<Arc<ControlState>>) -> Json<Vec<StreamStatus>> {
    Json(state.registry.list())
}

async fn health(State(state): State<Arc<ControlState>>) -> (StatusCode, &'static str) {
    if state.publisher.is_connected() {
        (StatusCode::OK, "OK\n")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "DEGRADED\n")
    }
}
