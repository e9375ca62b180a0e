//! WebSocket dialing with handshake headers and timeout.
//!
//! The reconnect loop itself lives with the stream session; this module only
//! owns the single-attempt dial: build the upgrade request, attach extra
//! headers (e.g. `Authorization`), and bound the handshake in time.

use std::collections::HashMap;
use std::time::Duration;

use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{RelayError, Result};

/// A connected client socket, plain or TLS.
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Parameters for a single dial attempt.
#[derive(Debug, Clone)]
pub struct DialConfig {
    /// Full WebSocket URL (e.g. `wss://api.upbit.com/websocket/v1`).
    pub url: String,
    /// Extra HTTP headers for the handshake.
    pub extra_headers: HashMap<String, String>,
    /// Upper bound on TCP connect + TLS + upgrade.
    pub handshake_timeout: Duration,
}

/// Dial `config.url` once.
pub async fn connect_ws(config: &DialConfig) -> Result<WsStream> {
    let mut request = config.url.as_str().into_client_request()?;

    for (key, value) in &config.extra_headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| RelayError::Config(format!("invalid header name '{key}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RelayError::Config(format!("invalid value for header '{key}': {e}")))?;
        request.headers_mut().insert(name, value);
    }

    debug!("dialing {} (timeout {:?})", config.url, config.handshake_timeout);

    match tokio::time::timeout(config.handshake_timeout, tokio_tungstenite::connect_async(request)).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(RelayError::WebSocket(e)),
        Err(_) => Err(RelayError::Timeout(config.handshake_timeout)),
    }
}

/// Extract the host from a URL string.
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url).map(|u| u.host_str().unwrap_or("").to_string()).unwrap_or_default()
}
