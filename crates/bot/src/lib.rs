//! Multi-account swing trading bot.
//!
//! The scan loop wakes on a fixed interval, re-reads its runtime config
//! from disk, evaluates a fail-closed execution gate, generates signals
//! with the active strategy, and routes sized trades to the broker when
//! and only when every gate condition holds. After every iteration a
//! sanitized status snapshot is written atomically for the control plane
//! to read; secrets never leave the process unmasked.

pub mod broker;
pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod logging;
pub mod redaction;
pub mod relay;
pub mod snapshot;
pub mod strategies;
pub mod types;

pub use config::{ConfigMarker, ConfigStore, RiskConfig, RuntimeConfig, WriteOutcome};
pub use core::runner::Runner;
pub use errors::{BotError, ValidationErrors};
pub use relay::LogRelay;
pub use snapshot::{SnapshotReader, SnapshotWriter};
pub use strategies::StrategyRegistry;
pub use types::{ExecutionRoute, StatusSnapshot, TradingMode};
