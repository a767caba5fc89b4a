use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV candle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub close: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub volume: Decimal,
}

/// Per-instrument candle history handed to a strategy for one scan iteration.
///
/// `BTreeMap` keeps instrument iteration order stable, which keeps signal
/// ordering and test output deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub fetched_at: i64,
    pub series: BTreeMap<String, Vec<Candle>>,
}

impl MarketSnapshot {
    pub fn candles(&self, instrument: &str) -> &[Candle] {
        self.series.get(instrument).map_or(&[], Vec::as_slice)
    }

    /// Latest close for an instrument, if any candles exist.
    pub fn last_close(&self, instrument: &str) -> Option<Decimal> {
        self.candles(instrument).last().map(|c| c.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(ts: i64, close: Decimal) -> Candle {
        Candle {
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(100),
        }
    }

    #[test]
    fn test_last_close() {
        let mut snapshot = MarketSnapshot::default();
        snapshot
            .series
            .insert("EUR_USD".into(), vec![candle(1, dec!(1.10)), candle(2, dec!(1.11))]);

        assert_eq!(snapshot.last_close("EUR_USD"), Some(dec!(1.11)));
        assert_eq!(snapshot.last_close("GBP_USD"), None);
        assert!(snapshot.candles("GBP_USD").is_empty());
    }
}
