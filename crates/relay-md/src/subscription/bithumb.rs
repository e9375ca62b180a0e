//! Bithumb subscription payloads.
//!
//! Trades are published on the `transaction` channel; tickers take an extra
//! list of aggregation windows.

use relay_core::DataKind;

pub const DEFAULT_SYMBOLS: &[&str] = &["BTC_KRW", "ETH_KRW"];

/// Ticker aggregation windows requested on every ticker subscription.
const TICK_TYPES: &[&str] = &["30M", "1H", "12H", "24H", "MID"];

pub fn build_subscribe(kind: DataKind, symbols: &[String]) -> String {
    match kind {
        DataKind::Trade => serde_json::json!({ "type": "transaction", "symbols": symbols }),
        DataKind::Ticker => serde_json::json!({ "type": "ticker", "symbols": symbols, "tickTypes": TICK_TYPES }),
    }
    .to_string()
}
