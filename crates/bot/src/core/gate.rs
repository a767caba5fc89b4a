//! Execution gate — default-to-deny decision over live order flow.
//!
//! Live execution requires four independent conditions to hold at once, and
//! any missing, false, or unparseable input denies. The gate is pure and
//! stateless: inputs are re-read from the environment every scan iteration,
//! so revoking a flag takes effect on the next iteration without a restart.

use crate::config::env_bool;
use crate::constants::{ENV_LIVE_TRADING, ENV_LIVE_TRADING_CONFIRM, ENV_PAPER_EXECUTION};
use crate::types::{AccountView, ExecutionRoute, TradingMode};

const COND_MODE: &str = "trading mode is not live";
const COND_LIVE_TRADING: &str = "LIVE_TRADING is not enabled";
const COND_LIVE_CONFIRM: &str = "LIVE_TRADING_CONFIRM is not enabled";
const COND_NO_CAPABLE_ACCOUNT: &str = "no account is execution capable";

/// One iteration's gate inputs, resolved to plain booleans. Unset, empty,
/// and unrecognizable env values have already collapsed to `false` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateInputs {
    pub mode: TradingMode,
    pub live_trading: bool,
    pub live_confirm: bool,
    pub paper_execution: bool,
    pub any_account_capable: bool,
}

impl GateInputs {
    /// Snapshot the environment and account capabilities for one iteration.
    pub fn from_env(mode: TradingMode, accounts: &[AccountView]) -> Self {
        Self {
            mode,
            live_trading: env_bool(ENV_LIVE_TRADING).unwrap_or(false),
            live_confirm: env_bool(ENV_LIVE_TRADING_CONFIRM).unwrap_or(false),
            paper_execution: env_bool(ENV_PAPER_EXECUTION).unwrap_or(false),
            any_account_capable: accounts.iter().any(|a| a.execution_capable),
        }
    }
}

/// Outcome of one gate evaluation, with every unmet live condition named
/// so denials can be audited instead of guessed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub permitted: bool,
    pub failed_conditions: Vec<&'static str>,
}

impl GateDecision {
    pub fn denial_reason(&self) -> Option<String> {
        if self.failed_conditions.is_empty() {
            None
        } else {
            Some(self.failed_conditions.join("; "))
        }
    }
}

/// The live-execution predicate: true only when every condition holds.
pub fn permits_live_execution(inputs: &GateInputs) -> bool {
    inputs.mode == TradingMode::Live
        && inputs.live_trading
        && inputs.live_confirm
        && inputs.any_account_capable
}

/// Evaluate the gate and record which conditions failed.
pub fn decide(inputs: &GateInputs) -> GateDecision {
    let mut failed = Vec::new();

    if inputs.mode != TradingMode::Live {
        failed.push(COND_MODE);
    }
    if !inputs.live_trading {
        failed.push(COND_LIVE_TRADING);
    }
    if !inputs.live_confirm {
        failed.push(COND_LIVE_CONFIRM);
    }
    if !inputs.any_account_capable {
        failed.push(COND_NO_CAPABLE_ACCOUNT);
    }

    GateDecision {
        permitted: failed.is_empty(),
        failed_conditions: failed,
    }
}

/// Select where this iteration's trades go.
///
/// Live only when the gate permits. Paper only in paper mode with paper
/// execution switched on. A denied gate in live mode routes to signals-only,
/// never to paper: live intent is never silently downgraded to simulation.
pub fn execution_route(
    decision: &GateDecision,
    mode: TradingMode,
    paper_execution: bool,
) -> ExecutionRoute {
    match mode {
        TradingMode::Live if decision.permitted => ExecutionRoute::Live,
        TradingMode::Live => ExecutionRoute::SignalsOnly,
        TradingMode::Paper if paper_execution => ExecutionRoute::Paper,
        TradingMode::Paper => ExecutionRoute::SignalsOnly,
    }
}
