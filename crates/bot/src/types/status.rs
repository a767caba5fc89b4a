use serde::{Deserialize, Serialize};

use super::account::{AccountView, Position};
use super::signal::{Signal, TradeIntent};
use crate::constants::STALENESS_INTERVAL_MULTIPLIER;

/// Top-level trading mode, from `TRADING_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    Paper,
    Live,
}

impl TradingMode {
    /// Parse an env value. Only an exact (case-insensitive) `live` selects
    /// live mode; anything else, including garbage and unset, is paper.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim).map(str::to_lowercase).as_deref() {
            Some("live") => TradingMode::Live,
            _ => TradingMode::Paper,
        }
    }
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Paper => write!(f, "paper"),
            TradingMode::Live => write!(f, "live"),
        }
    }
}

/// Where signals go once generated.
///
/// `SignalsOnly` covers both paper mode without simulated fills and live mode
/// with a denied gate. A denied live gate never falls back to paper fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionRoute {
    Live,
    Paper,
    SignalsOnly,
}

impl std::fmt::Display for ExecutionRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionRoute::Live => write!(f, "live"),
            ExecutionRoute::Paper => write!(f, "paper"),
            ExecutionRoute::SignalsOnly => write!(f, "signals_only"),
        }
    }
}

/// One-way state handoff written by the scan loop after every iteration and
/// read by the control plane. Always sanitized before it leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub mode: TradingMode,
    pub execution_enabled: bool,
    pub execution_route: ExecutionRoute,
    pub accounts_loaded: u32,
    pub accounts_execution_capable: u32,
    pub active_strategy_key: String,
    pub scan_interval_seconds: u64,
    pub iteration: u64,
    pub last_scan_timestamp: i64,
    pub last_scan_duration_ms: u64,
    pub last_signals_generated: u32,
    pub last_executed_count: u32,
    /// Signals the execution gate kept from the execution path this
    /// iteration. Distinguishes "no opportunity" from "blocked by gate".
    pub last_gate_denied: u32,
    pub pending_signals: Vec<Signal>,
    pub pending_trades: Vec<TradeIntent>,
    pub accounts: Vec<AccountView>,
    pub open_positions: Vec<Position>,
}

impl StatusSnapshot {
    /// Enforce the fail-closed invariant: `execution_enabled` is true only
    /// with at least one capable account and a live route. Any inconsistent
    /// combination collapses to disabled rather than erroring.
    pub fn normalized(mut self) -> Self {
        if self.accounts_execution_capable == 0 {
            self.execution_enabled = false;
        }
        if self.execution_route != ExecutionRoute::Live {
            self.execution_enabled = false;
        }
        if !self.execution_enabled && self.execution_route == ExecutionRoute::Live {
            self.execution_route = ExecutionRoute::SignalsOnly;
        }
        self
    }

    pub fn age_seconds(&self, now_unix: i64) -> i64 {
        now_unix - self.last_scan_timestamp
    }

    /// Readers must treat an old snapshot as stale, never as current. The
    /// threshold derives from the cadence the snapshot itself reports, so a
    /// reader needs no out-of-band knowledge of the scan interval.
    pub fn is_stale(&self, now_unix: i64, grace_seconds: u64) -> bool {
        let threshold =
            (STALENESS_INTERVAL_MULTIPLIER * self.scan_interval_seconds + grace_seconds) as i64;
        self.age_seconds(now_unix) > threshold
    }
}
