//! Z-score mean-reversion strategy for major FX pairs.
//!
//! Fades closes that stretch more than `ENTRY_Z` standard deviations from
//! the 20-bar mean, targeting a move back to the mean.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::indicators::{sma, stddev, unit_clamp};
use super::{RiskProfile, Strategy, StrategyDescriptor};
use crate::types::{Direction, MarketSnapshot, Signal};

const KEY: &str = "meanrev";
const PERIOD: usize = 20;
const ENTRY_Z: Decimal = dec!(1.5);
const STOP_SDS: Decimal = dec!(1.5);
const MAX_Z: Decimal = dec!(3);

pub fn descriptor() -> StrategyDescriptor {
    StrategyDescriptor {
        key: KEY.into(),
        name: "Z-score mean reversion".into(),
        instruments: vec!["EUR_USD".into(), "GBP_USD".into(), "AUD_USD".into()],
        risk_profile: RiskProfile::Conservative,
    }
}

pub struct MeanReversion {
    descriptor: StrategyDescriptor,
}

impl MeanReversion {
    pub fn new() -> Self {
        Self {
            descriptor: descriptor(),
        }
    }
}

impl Default for MeanReversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MeanReversion {
    fn key(&self) -> &str {
        KEY
    }

    fn generate_signals(&mut self, market: &MarketSnapshot) -> Vec<Signal> {
        let mut signals = Vec::new();

        for instrument in &self.descriptor.instruments {
            let closes: Vec<Decimal> =
                market.candles(instrument).iter().map(|c| c.close).collect();

            let (Some(mean), Some(sd)) = (sma(&closes, PERIOD), stddev(&closes, PERIOD)) else {
                continue;
            };
            if sd <= Decimal::ZERO {
                continue;
            }

            let close = match closes.last() {
                Some(close) => *close,
                None => continue,
            };
            let z = (close - mean) / sd;

            let side = if z <= -ENTRY_Z {
                Direction::Long
            } else if z >= ENTRY_Z {
                Direction::Short
            } else {
                continue;
            };

            // Stop a further stretch beyond the entry, target back at the mean.
            let stop = match side {
                Direction::Long => close - sd * STOP_SDS,
                Direction::Short => close + sd * STOP_SDS,
            };
            let score = unit_clamp(z.abs() / MAX_Z);

            signals.push(Signal {
                id: Signal::make_id(KEY, instrument, market.fetched_at),
                strategy_key: KEY.into(),
                instrument: instrument.clone(),
                direction: side,
                entry_price: close,
                stop_loss: stop,
                take_profit: mean,
                score,
                generated_at: market.fetched_at,
            });
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candle;

    fn candle(ts: i64, close: Decimal) -> Candle {
        Candle {
            timestamp: ts,
            open: close,
            high: close + dec!(0.0005),
            low: close - dec!(0.0005),
            close,
            volume: dec!(800),
        }
    }

    /// 19 alternating bars around 1.1000, then one bar at `last_close`.
    fn market_with_last(instrument: &str, last_close: Decimal) -> MarketSnapshot {
        let mut closes: Vec<Decimal> = (0..19)
            .map(|i| {
                if i % 2 == 0 {
                    dec!(1.0990)
                } else {
                    dec!(1.1010)
                }
            })
            .collect();
        closes.push(last_close);

        let mut market = MarketSnapshot {
            fetched_at: 1_700_000_000,
            ..Default::default()
        };
        market.series.insert(
            instrument.into(),
            closes.iter().enumerate().map(|(i, &c)| candle(i as i64, c)).collect(),
        );
        market
    }

    #[test]
    fn test_stretched_low_close_goes_long() {
        let mut strategy = MeanReversion::new();
        let market = market_with_last("EUR_USD", dec!(1.0940));

        let signals = strategy.generate_signals(&market);
        assert_eq!(signals.len(), 1);
        let signal = &signals[0];
        assert_eq!(signal.direction, Direction::Long);
        // Target is the mean: above the stretched entry.
        assert!(signal.take_profit > signal.entry_price);
        assert!(signal.stop_loss < signal.entry_price);
    }

    #[test]
    fn test_stretched_high_close_goes_short() {
        let mut strategy = MeanReversion::new();
        let market = market_with_last("GBP_USD", dec!(1.1060));

        let signals = strategy.generate_signals(&market);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Short);
        assert!(signals[0].take_profit < signals[0].entry_price);
    }

    #[test]
    fn test_close_near_mean_is_silent() {
        let mut strategy = MeanReversion::new();
        let market = market_with_last("EUR_USD", dec!(1.1002));
        assert!(strategy.generate_signals(&market).is_empty());
    }

    #[test]
    fn test_flat_series_is_silent() {
        let mut strategy = MeanReversion::new();
        let mut market = MarketSnapshot::default();
        market.series.insert(
            "EUR_USD".into(),
            (0..30).map(|i| candle(i, dec!(1.1000))).collect(),
        );
        // Zero standard deviation: no divide, no signal.
        assert!(strategy.generate_signals(&market).is_empty());
    }
}
