//! Enumerations naming the streams the relay can run.
//!
//! Both enums parse case-insensitively from the control-surface path segments
//! and render back in lowercase, so they round-trip through URLs and logs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

// ---------------------------------------------------------------------------
// Platforms
// ---------------------------------------------------------------------------

/// Exchanges with a WebSocket market-data feed the relay knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Upbit,
    Bithumb,
    Binance,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Upbit, Platform::Bithumb, Platform::Binance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upbit => "upbit",
            Self::Bithumb => "bithumb",
            Self::Binance => "binance",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upbit" => Ok(Self::Upbit),
            "bithumb" => Ok(Self::Bithumb),
            "binance" => Ok(Self::Binance),
            _ => Err(RelayError::UnknownPlatform(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Data kinds
// ---------------------------------------------------------------------------

/// Queue receiving every trade frame, regardless of platform.
pub const TRADE_QUEUE: &str = "trade_queue";

/// Queue receiving every ticker frame, regardless of platform.
pub const TICKER_QUEUE: &str = "ticker_queue";

/// Category of market event relayed by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Trade,
    Ticker,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "trade",
            Self::Ticker => "ticker",
        }
    }

    /// Queue topic that frames of this kind are published to.
    pub fn queue(&self) -> &'static str {
        match self {
            Self::Trade => TRADE_QUEUE,
            Self::Ticker => TICKER_QUEUE,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trade" => Ok(Self::Trade),
            "ticker" => Ok(Self::Ticker),
            _ => Err(RelayError::UnknownDataKind(s.to_string())),
        }
    }
}
