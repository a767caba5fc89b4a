//! Channel-breakout strategy for spot gold.
//!
//! Watches a 20-bar high/low channel on XAU_USD and signals when the close
//! escapes it. Re-arms only after price trades back inside the channel.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::indicators::{highest, lowest, unit_clamp};
use super::{RiskProfile, Strategy, StrategyDescriptor};
use crate::types::{Direction, MarketSnapshot, Signal};

const KEY: &str = "gold";
const INSTRUMENT: &str = "XAU_USD";
const CHANNEL_LOOKBACK: usize = 20;
const REWARD_RISK: Decimal = dec!(2);

pub fn descriptor() -> StrategyDescriptor {
    StrategyDescriptor {
        key: KEY.into(),
        name: "Gold channel breakout".into(),
        instruments: vec![INSTRUMENT.into()],
        risk_profile: RiskProfile::Aggressive,
    }
}

pub struct GoldBreakout {
    /// Side of the most recent breakout; cleared once price closes back
    /// inside the channel so the next escape fires again.
    last_breakout: Option<Direction>,
}

impl GoldBreakout {
    pub fn new() -> Self {
        Self { last_breakout: None }
    }
}

impl Default for GoldBreakout {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for GoldBreakout {
    fn key(&self) -> &str {
        KEY
    }

    fn generate_signals(&mut self, market: &MarketSnapshot) -> Vec<Signal> {
        let candles = market.candles(INSTRUMENT);
        if candles.len() < CHANNEL_LOOKBACK + 1 {
            return Vec::new();
        }

        // Channel from the bars before the current one, so the breakout bar
        // does not move its own trigger.
        let prior = &candles[..candles.len() - 1];
        let highs: Vec<Decimal> = prior.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = prior.iter().map(|c| c.low).collect();
        let (Some(channel_high), Some(channel_low)) = (
            highest(&highs, CHANNEL_LOOKBACK),
            lowest(&lows, CHANNEL_LOOKBACK),
        ) else {
            return Vec::new();
        };
        let width = channel_high - channel_low;
        if width <= Decimal::ZERO {
            return Vec::new();
        }

        let close = candles[candles.len() - 1].close;
        let midpoint = (channel_high + channel_low) / dec!(2);

        let side = if close > channel_high {
            Direction::Long
        } else if close < channel_low {
            Direction::Short
        } else {
            self.last_breakout = None;
            return Vec::new();
        };
        if self.last_breakout == Some(side) {
            return Vec::new();
        }
        self.last_breakout = Some(side);

        let risk = (close - midpoint).abs();
        let take_profit = match side {
            Direction::Long => close + risk * REWARD_RISK,
            Direction::Short => close - risk * REWARD_RISK,
        };
        let escape = match side {
            Direction::Long => close - channel_high,
            Direction::Short => channel_low - close,
        };
        let score = unit_clamp(dec!(0.5) + escape / width);

        vec![Signal {
            id: Signal::make_id(KEY, INSTRUMENT, market.fetched_at),
            strategy_key: KEY.into(),
            instrument: INSTRUMENT.into(),
            direction: side,
            entry_price: close,
            stop_loss: midpoint,
            take_profit,
            score,
            generated_at: market.fetched_at,
        }]
    }
}
