//! Dual-EMA momentum strategy.
//!
//! Emits a signal when the fast EMA crosses the slow EMA, once per cross per
//! instrument. The score is this strategy's own blend of trend separation
//! and is not comparable across strategies.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::indicators::{ema, highest, lowest, unit_clamp};
use super::{RiskProfile, Strategy, StrategyDescriptor};
use crate::types::{Direction, MarketSnapshot, Signal};

const KEY: &str = "momentum";
const EMA_FAST: usize = 10;
const EMA_SLOW: usize = 30;
const STOP_LOOKBACK: usize = 14;
const REWARD_RISK: Decimal = dec!(2);

pub fn descriptor() -> StrategyDescriptor {
    StrategyDescriptor {
        key: KEY.into(),
        name: "Dual-EMA momentum".into(),
        instruments: vec!["EUR_USD".into(), "USD_JPY".into()],
        risk_profile: RiskProfile::Balanced,
    }
}

pub struct Momentum {
    descriptor: StrategyDescriptor,
    /// Last emitted side per instrument; suppresses repeats until the
    /// EMAs actually cross again.
    last_side: HashMap<String, Direction>,
}

impl Momentum {
    pub fn new() -> Self {
        Self {
            descriptor: descriptor(),
            last_side: HashMap::new(),
        }
    }
}

impl Default for Momentum {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for Momentum {
    fn key(&self) -> &str {
        KEY
    }

    fn generate_signals(&mut self, market: &MarketSnapshot) -> Vec<Signal> {
        let mut signals = Vec::new();

        for instrument in &self.descriptor.instruments {
            let candles = market.candles(instrument);
            let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();

            let (Some(fast), Some(slow)) = (ema(&closes, EMA_FAST), ema(&closes, EMA_SLOW))
            else {
                continue;
            };
            let side = match fast.cmp(&slow) {
                std::cmp::Ordering::Greater => Direction::Long,
                std::cmp::Ordering::Less => Direction::Short,
                std::cmp::Ordering::Equal => continue,
            };
            if self.last_side.get(instrument) == Some(&side) {
                continue;
            }

            let entry = match closes.last() {
                Some(close) => *close,
                None => continue,
            };
            let stop = match side {
                Direction::Long => {
                    let lows: Vec<Decimal> = candles.iter().map(|c| c.low).collect();
                    lowest(&lows, STOP_LOOKBACK)
                }
                Direction::Short => {
                    let highs: Vec<Decimal> = candles.iter().map(|c| c.high).collect();
                    highest(&highs, STOP_LOOKBACK)
                }
            };
            let Some(stop) = stop.filter(|s| *s != entry) else {
                continue;
            };

            let risk = (entry - stop).abs();
            let take_profit = match side {
                Direction::Long => entry + risk * REWARD_RISK,
                Direction::Short => entry - risk * REWARD_RISK,
            };
            let score = unit_clamp((fast - slow).abs() / risk);

            self.last_side.insert(instrument.clone(), side);
            signals.push(Signal {
                id: Signal::make_id(KEY, instrument, market.fetched_at),
                strategy_key: KEY.into(),
                instrument: instrument.clone(),
                direction: side,
                entry_price: entry,
                stop_loss: stop,
                take_profit,
                score,
                generated_at: market.fetched_at,
            });
        }

        signals
    }
}
