//! Exchange subscription payloads.
//!
//! Pure functions of `(platform, kind, symbols)`. Platforms whose socket
//! streams the full feed without a handshake return `None`.

pub mod bithumb;
pub mod upbit;

use relay_core::{DataKind, Platform};

/// Build the message sent right after connecting, if the platform needs one.
pub fn build_subscribe(platform: Platform, kind: DataKind, symbols: &[String]) -> Option<String> {
    match platform {
        Platform::Upbit => Some(upbit::build_subscribe(kind, symbols)),
        Platform::Bithumb => Some(bithumb::build_subscribe(kind, symbols)),
        // Binance selects streams through the URL path.
        Platform::Binance => None,
    }
}

/// Symbol universe used when the exchange config does not list one.
pub fn default_symbols(platform: Platform) -> Vec<String> {
    let defaults: &[&str] = match platform {
        Platform::Upbit => upbit::DEFAULT_MARKETS,
        Platform::Bithumb => bithumb::DEFAULT_SYMBOLS,
        Platform::Binance => &[],
    };
    defaults.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binance_needs_no_subscription() {
        assert!(build_subscribe(Platform::Binance, DataKind::Trade, &[]).is_none());
        assert!(default_symbols(Platform::Binance).is_empty());
    }

    #[test]
    fn only_binance_streams_without_subscription() {
        for platform in Platform::ALL {
            for kind in [DataKind::Trade, DataKind::Ticker] {
                let payload = build_subscribe(platform, kind, &default_symbols(platform));
                assert_eq!(payload.is_none(), platform == Platform::Binance, "{platform}/{kind}");
            }
        }
    }

    #[test]
    fn default_universes() {
        let upbit = default_symbols(Platform::Upbit);
        assert_eq!(upbit.first().map(String::as_str), Some("KRW-BTC"));
        assert!(upbit.iter().all(|s| s.starts_with("KRW-")));
        assert_eq!(default_symbols(Platform::Bithumb), vec!["BTC_KRW", "ETH_KRW"]);
    }
}
