use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// A trade opportunity emitted by a strategy.
///
/// `score` is the strategy's own quality assessment in [0, 1]. Each strategy
/// computes it differently; nothing downstream interprets it beyond
/// passing it through for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub strategy_key: String,
    pub instrument: String,
    pub direction: Direction,
    #[serde(with = "rust_decimal::serde::str")]
    pub entry_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub stop_loss: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub take_profit: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub score: Decimal,
    pub generated_at: i64,
}

impl Signal {
    /// Deterministic id from origin and time; unique enough for one scan
    /// iteration, stable for tests.
    pub fn make_id(strategy_key: &str, instrument: &str, generated_at: i64) -> String {
        format!("{strategy_key}-{instrument}-{generated_at}")
    }

    /// Distance between entry and stop, always positive.
    pub fn risk_per_unit(&self) -> Decimal {
        (self.entry_price - self.stop_loss).abs()
    }
}

/// A signal sized for a specific account, ready for the execution path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    pub signal_id: String,
    pub account_id: String,
    pub instrument: String,
    pub direction: Direction,
    /// Position size in instrument units.
    #[serde(with = "rust_decimal::serde::str")]
    pub units: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub entry_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub stop_loss: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub take_profit: Decimal,
}

/// Outcome of a broker execution for one trade intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub signal_id: String,
    pub account_id: String,
    pub instrument: String,
    pub direction: Direction,
    #[serde(with = "rust_decimal::serde::str")]
    pub units: Decimal,
    /// Actual fill price after slippage.
    #[serde(with = "rust_decimal::serde::str")]
    pub fill_price: Decimal,
    pub executed_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_risk_per_unit_is_absolute() {
        let long = Signal {
            id: "t".into(),
            strategy_key: "momentum".into(),
            instrument: "EUR_USD".into(),
            direction: Direction::Long,
            entry_price: dec!(1.1000),
            stop_loss: dec!(1.0950),
            take_profit: dec!(1.1100),
            score: dec!(0.6),
            generated_at: 0,
        };
        assert_eq!(long.risk_per_unit(), dec!(0.0050));

        let short = Signal {
            direction: Direction::Short,
            entry_price: dec!(1.0950),
            stop_loss: dec!(1.1000),
            ..long
        };
        assert_eq!(short.risk_per_unit(), dec!(0.0050));
    }

    #[test]
    fn test_signal_serde_round_trip() {
        let signal = Signal {
            id: Signal::make_id("gold", "XAU_USD", 1_700_000_000),
            strategy_key: "gold".into(),
            instrument: "XAU_USD".into(),
            direction: Direction::Short,
            entry_price: dec!(2410.50),
            stop_loss: dec!(2422.00),
            take_profit: dec!(2380.00),
            score: dec!(0.72),
            generated_at: 1_700_000_000,
        };
        let json = serde_json::to_string(&signal).unwrap();
        // Decimals travel as strings on the wire.
        assert!(json.contains("\"2410.50\""));
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "gold-XAU_USD-1700000000");
        assert_eq!(back.direction, Direction::Short);
        assert_eq!(back.score, dec!(0.72));
    }
}
