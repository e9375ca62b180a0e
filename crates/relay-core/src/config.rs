//! Configuration parsing for the relay.
//!
//! Settings come from a single JSON file; every section has defaults so a
//! minimal file only lists the exchanges. Secrets and hosts can be overridden
//! from the environment, which is read once at startup.
//!
//! # Example config
//!
//! ```json
//! {
//!   "logging": { "module_name": "relay", "log_path": "/var/log/relay" },
//!   "http": { "host": "0.0.0.0", "port": 8080 },
//!   "rabbit": { "host": "localhost", "port": 5672, "username": "guest", "password": "guest" },
//!   "session": { "initial_backoff_ms": 1000, "max_backoff_ms": 120000 },
//!   "exchanges": {
//!     "upbit": { "ws_url": "wss://api.upbit.com/websocket/v1" },
//!     "binance": { "trade_url": "wss://stream.binance.com:9443/ws/btcusdt@trade" }
//!   }
//! }
//! ```
//!
//! # Environment overrides
//!
//! `RABBIT_USERNAME`, `RABBIT_PASSWORD`, `RABBIT_HOST`, `RABBIT_PORT`, and per
//! platform `<PLATFORM>_URL`, `<PLATFORM>_ACCESS`, `<PLATFORM>_SECRET`
//! (e.g. `UPBIT_URL`, `UPBIT_ACCESS`, `UPBIT_SECRET`).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::Credentials;
use crate::error::{RelayError, Result};
use crate::types::{DataKind, Platform};

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging metadata (file prefix, log directory).
    pub logging: Option<LoggingMeta>,
    /// Control surface listener.
    pub http: HttpConfig,
    /// Message broker connection.
    pub rabbit: RabbitConfig,
    /// Reconnect and handshake tuning shared by every stream session.
    pub session: SessionConfig,
    /// Per-platform endpoints and credentials, keyed by lowercase platform name.
    pub exchanges: BTreeMap<String, ExchangeConfig>,
}

/// Logging metadata block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 8080 }
    }
}

impl HttpConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// RabbitMQ connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RabbitConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Virtual host (default `/`).
    pub vhost: String,
    /// Dial attempts per connect before giving up (default: 5).
    pub connect_retries: u32,
    /// Fixed pause between dial attempts (default: 5000 ms).
    pub retry_interval_ms: u64,
}

impl Default for RabbitConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5672,
            username: "guest".into(),
            password: "guest".into(),
            vhost: "/".into(),
            connect_retries: 5,
            retry_interval_ms: 5_000,
        }
    }
}

impl RabbitConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Stream session tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// First reconnect delay (default: 1000 ms).
    pub initial_backoff_ms: u64,
    /// Reconnect delay cap (default: 120000 ms).
    pub max_backoff_ms: u64,
    /// WebSocket handshake timeout (default: 10000 ms).
    pub handshake_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { initial_backoff_ms: 1_000, max_backoff_ms: 120_000, handshake_timeout_ms: 10_000 }
    }
}

impl SessionConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// One exchange's endpoints, symbol universe and credentials.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Endpoint used for every data kind unless a per-kind URL is set.
    pub ws_url: Option<String>,
    /// Endpoint override for trade streams.
    pub trade_url: Option<String>,
    /// Endpoint override for ticker streams.
    pub ticker_url: Option<String>,
    /// Symbol universe for the subscription payload. Platform default if absent.
    pub symbols: Option<Vec<String>>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Keep-alive ping interval in seconds. No pings if absent.
    pub ping_interval_sec: Option<u64>,
}

impl ExchangeConfig {
    /// Endpoint for `kind`, preferring the per-kind override.
    pub fn url_for(&self, kind: DataKind) -> Option<&str> {
        let specific = match kind {
            DataKind::Trade => self.trade_url.as_deref(),
            DataKind::Ticker => self.ticker_url.as_deref(),
        };
        specific.or(self.ws_url.as_deref())
    }

    /// Credentials for the handshake, if any are configured.
    ///
    /// An access key without a usable secret is a configuration error.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        match (self.access_key.as_deref(), self.secret_key.as_deref()) {
            (None | Some(""), None | Some("")) => Ok(None),
            (Some(access), secret) => Credentials::new(access, secret.unwrap_or_default()).map(Some),
            (None, Some(_)) => Err(RelayError::Auth("secret key configured without an access key".into())),
        }
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        self.ping_interval_sec.filter(|s| *s > 0).map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Exchange block for `platform`, if configured.
    pub fn exchange(&self, platform: Platform) -> Option<&ExchangeConfig> {
        self.exchanges.get(platform.as_str())
    }

    /// Module name used as the log file prefix.
    pub fn module_name(&self) -> String {
        self.logging.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "relay".into())
    }

    pub fn log_path(&self) -> Option<String> {
        self.logging.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the variable source.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// wipe a value from the file.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("RABBIT_USERNAME") {
            self.rabbit.username = v;
        }
        if let Some(v) = get("RABBIT_PASSWORD") {
            self.rabbit.password = v;
        }
        if let Some(v) = get("RABBIT_HOST") {
            self.rabbit.host = v;
        }
        if let Some(port) = get("RABBIT_PORT").and_then(|v| v.parse().ok()) {
            self.rabbit.port = port;
        }

        for platform in Platform::ALL {
            let prefix = platform.as_str().to_ascii_uppercase();
            let url = get(&format!("{prefix}_URL"));
            let access = get(&format!("{prefix}_ACCESS"));
            let secret = get(&format!("{prefix}_SECRET"));
            if url.is_none() && access.is_none() && secret.is_none() {
                continue;
            }
            let entry = self.exchanges.entry(platform.as_str().to_string()).or_default();
            if url.is_some() {
                entry.ws_url = url;
            }
            if access.is_some() {
                entry.access_key = access;
            }
            if secret.is_some() {
                entry.secret_key = secret;
            }
        }
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.rabbit.host.is_empty() {
            return Err(RelayError::Config("rabbit.host is empty".into()));
        }
        if self.rabbit.connect_retries == 0 {
            return Err(RelayError::Config("rabbit.connect_retries must be at least 1".into()));
        }
        if self.session.initial_backoff_ms == 0 || self.session.initial_backoff_ms > self.session.max_backoff_ms {
            return Err(RelayError::Config(format!(
                "session backoff must satisfy 0 < initial ({}) <= max ({})",
                self.session.initial_backoff_ms, self.session.max_backoff_ms
            )));
        }
        if self.session.handshake_timeout_ms == 0 {
            return Err(RelayError::Config("session.handshake_timeout_ms must be positive".into()));
        }

        for (name, exchange) in &self.exchanges {
            name.parse::<Platform>()?;
            for url in [&exchange.ws_url, &exchange.trade_url, &exchange.ticker_url].into_iter().flatten() {
                validate_ws_url(name, url)?;
            }
        }
        Ok(())
    }
}

fn validate_ws_url(exchange: &str, raw: &str) -> Result<()> {
    let url = url::Url::parse(raw).map_err(|e| RelayError::Config(format!("{exchange}: invalid url '{raw}': {e}")))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(RelayError::Config(format!("{exchange}: url '{raw}' has scheme '{other}', expected ws or wss"))),
    }
}

/// Parse a config from a JSON string and validate it (no env overrides).
pub fn parse_config(content: &str) -> anyhow::Result<AppConfig> {
    let mut config: AppConfig = serde_json::from_str(content)?;
    config.exchanges = config.exchanges.into_iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect();
    config.validate()?;
    Ok(config)
}

/// Load a JSON config file, apply environment overrides, and validate.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}
