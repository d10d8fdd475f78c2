//! Candle (OHLCV) data and field selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candle as delivered by the market-data feed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bar {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Calculate the typical price (HLC average).
    #[inline]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Extract the scalar a source node should emit for this bar.
    #[inline]
    pub fn field(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::Volume => self.volume,
            PriceField::Typical => self.typical_price(),
        }
    }
}

/// Which scalar of a candle feeds a source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
    Volume,
    Typical,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Volume => "volume",
            PriceField::Typical => "typical",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_fields() {
        let bar = Bar::new(1000, 100.0, 110.0, 95.0, 105.0, 1_000_000.0);

        assert!((bar.typical_price() - 103.333333).abs() < 0.001);
        assert_eq!(bar.field(PriceField::Open), 100.0);
        assert_eq!(bar.field(PriceField::High), 110.0);
        assert_eq!(bar.field(PriceField::Low), 95.0);
        assert_eq!(bar.field(PriceField::Close), 105.0);
        assert_eq!(bar.field(PriceField::Volume), 1_000_000.0);
        assert_eq!(bar.field(PriceField::Typical), bar.typical_price());
    }

    #[test]
    fn test_price_field_serde() {
        let field: PriceField = serde_json::from_str("\"volume\"").unwrap();
        assert_eq!(field, PriceField::Volume);
        assert_eq!(serde_json::to_string(&PriceField::Typical).unwrap(), "\"typical\"");
        assert_eq!(PriceField::default(), PriceField::Close);
        assert_eq!(PriceField::Volume.to_string(), "volume");
    }
}
