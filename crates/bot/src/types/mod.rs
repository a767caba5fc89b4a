pub mod account;
pub mod market;
pub mod signal;
pub mod status;

pub use account::{AccountView, Position};
pub use market::{Candle, MarketSnapshot};
pub use signal::{Direction, ExecutionReport, Signal, TradeIntent};
pub use status::{ExecutionRoute, StatusSnapshot, TradingMode};
