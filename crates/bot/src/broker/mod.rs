//! Broker abstraction and the in-process paper implementation.

pub mod paper;

pub use paper::PaperBroker;

use crate::errors::BotError;
use crate::types::{AccountView, ExecutionReport, MarketSnapshot, Position, TradeIntent};

/// Seam between the scan loop and order flow.
///
/// Deliberately synchronous: the scan loop is strictly sequential with its
/// interval sleep as the only suspension point, and a sync trait means a
/// broker call can be slow but can never yield mid-iteration.
pub trait BrokerClient: Send {
    /// Current view of every trading account.
    fn list_accounts(&self) -> Result<Vec<AccountView>, BotError>;

    /// Advance to and return the latest per-instrument candle history.
    fn market_snapshot(&mut self) -> Result<MarketSnapshot, BotError>;

    /// Submit one sized trade and return the fill.
    fn execute(&mut self, intent: &TradeIntent) -> Result<ExecutionReport, BotError>;

    /// All open positions across accounts.
    fn open_positions(&self) -> Result<Vec<Position>, BotError>;
}
