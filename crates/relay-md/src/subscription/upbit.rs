//! Upbit subscription payloads.
//!
//! Upbit takes a JSON array of a ticket, one type field, and a format field:
//!
//! ```json
//! [{"ticket":"<uuid>"},{"type":"trade","isOnlyRealtime":true,"codes":["KRW-BTC"]},{"format":"SIMPLE"}]
//! ```

use relay_core::DataKind;

/// KRW markets subscribed when the config gives no symbol list.
pub const DEFAULT_MARKETS: &[&str] = &[
    "KRW-BTC", "KRW-ETH", "KRW-NEO", "KRW-MTL", "KRW-XRP", "KRW-ETC", "KRW-SNT", "KRW-WAVES", "KRW-XEM",
    "KRW-QTUM", "KRW-LSK", "KRW-STEEM", "KRW-XLM", "KRW-ARDR", "KRW-ARK", "KRW-STORJ", "KRW-GRS", "KRW-ADA",
    "KRW-SBD", "KRW-POWR", "KRW-BTG", "KRW-ICX", "KRW-EOS", "KRW-TRX", "KRW-SC", "KRW-ONT", "KRW-ZIL",
    "KRW-POLYX", "KRW-ZRX", "KRW-LOOM", "KRW-BCH", "KRW-BAT", "KRW-IOST", "KRW-CVC", "KRW-IQ", "KRW-IOTA",
    "KRW-HIFI", "KRW-ONG", "KRW-GAS", "KRW-UPP", "KRW-ELF", "KRW-KNC", "KRW-BSV", "KRW-THETA", "KRW-QKC",
    "KRW-BTT", "KRW-MOC", "KRW-TFUEL", "KRW-MANA", "KRW-ANKR", "KRW-AERGO", "KRW-ATOM", "KRW-TT", "KRW-CRE",
    "KRW-MBL", "KRW-WAXP", "KRW-HBAR", "KRW-MED", "KRW-MLK", "KRW-STPT", "KRW-ORBS", "KRW-VET", "KRW-CHZ",
    "KRW-STMX", "KRW-DKA", "KRW-HIVE", "KRW-KAVA", "KRW-AHT", "KRW-LINK", "KRW-XTZ", "KRW-BORA", "KRW-JST",
    "KRW-CRO", "KRW-TON", "KRW-SXP", "KRW-HUNT", "KRW-PLA", "KRW-DOT", "KRW-MVL", "KRW-STRAX", "KRW-AQT",
    "KRW-GLM", "KRW-SSX", "KRW-META", "KRW-FCT2", "KRW-CBK", "KRW-SAND", "KRW-HPO", "KRW-DOGE", "KRW-STRK",
    "KRW-PUNDIX", "KRW-FLOW", "KRW-AXS", "KRW-STX", "KRW-XEC", "KRW-SOL", "KRW-MATIC", "KRW-AAVE", "KRW-1INCH",
    "KRW-ALGO", "KRW-NEAR", "KRW-AVAX", "KRW-T", "KRW-CELO", "KRW-GMT", "KRW-APT", "KRW-SHIB", "KRW-MASK",
    "KRW-ARB", "KRW-EGLD", "KRW-SUI", "KRW-GRT", "KRW-BLUR", "KRW-IMX", "KRW-SEI", "KRW-MINA",
];

/// Build the subscription message. A fresh ticket is drawn on every call.
pub fn build_subscribe(kind: DataKind, codes: &[String]) -> String {
    serde_json::json!([
        { "ticket": uuid::Uuid::new_v4().to_string() },
        { "type": kind.as_str(), "isOnlyRealtime": true, "codes": codes },
        { "format": "SIMPLE" }
    ])
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_payload_shape() {
        let codes = vec!["KRW-BTC".to_string(), "KRW-ETH".to_string()];
        let v: serde_json::Value = serde_json::from_str(&build_subscribe(DataKind::Trade, &codes)).unwrap();
        let arr = v.as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[0]["ticket"].as_str().unwrap().len(), 36);
        assert_eq!(arr[1]["type"], "trade");
        assert_eq!(arr[1]["isOnlyRealtime"], true);
        assert_eq!(arr[1]["codes"], serde_json::json!(["KRW-BTC", "KRW-ETH"]));
        assert_eq!(arr[2]["format"], "SIMPLE");
    }

    #[test]
    fn ticker_payload_uses_ticker_type() {
        let v: serde_json::Value =
            serde_json::from_str(&build_subscribe(DataKind::Ticker, &["KRW-SOL".into()])).unwrap();
        assert_eq!(v[1]["type"], "ticker");
    }

    #[test]
    fn tickets_are_unique() {
        let a = build_subscribe(DataKind::Trade, &[]);
        let b = build_subscribe(DataKind::Trade, &[]);
        assert_ne!(a, b);
    }
}
