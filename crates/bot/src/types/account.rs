use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::signal::Direction;

/// Broker-reported view of one trading account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub alias: String,
    pub currency: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub margin_available: Decimal,
    /// Whether the broker will accept orders for this account right now.
    pub execution_capable: bool,
    pub open_position_count: u32,
}

/// An open position on one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub account_id: String,
    pub instrument: String,
    pub direction: Direction,
    #[serde(with = "rust_decimal::serde::str")]
    pub units: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub avg_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unrealized_pnl: Decimal,
    pub opened_at: i64,
}
