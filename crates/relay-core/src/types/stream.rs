//! Stream identity.

use std::fmt;

use serde::Serialize;

use super::enums::{DataKind, Platform};

/// Identifies one logical managed stream: a (platform, data kind) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StreamKey {
    pub platform: Platform,
    pub kind: DataKind,
}

impl StreamKey {
    pub fn new(platform: Platform, kind: DataKind) -> Self {
        Self { platform, kind }
    }

    /// Parse both path segments of a control request.
    pub fn parse(platform: &str, kind: &str) -> crate::error::Result<Self> {
        Ok(Self { platform: platform.parse()?, kind: kind.parse()? })
    }
}

/// Renders as `platform/kind`, the label used in log lines.
impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_label() {
        let key = StreamKey::parse("upbit", "trade").unwrap();
        assert_eq!(key, StreamKey::new(Platform::Upbit, DataKind::Trade));
        assert_eq!(key.to_string(), "upbit/trade");
    }

    #[test]
    fn parse_rejects_either_segment() {
        assert!(StreamKey::parse("upbit", "depth").is_err());
        assert!(StreamKey::parse("nowhere", "trade").is_err());
    }
}
