//! Fixed-fractional position sizing and the per-day trade budget.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::RiskConfig;
use crate::types::{AccountView, Signal, TradeIntent};

/// Units to trade so a stop-out loses at most `max_risk_per_trade` of the
/// account balance. Rounded down to whole units; zero when the stop distance
/// is zero or there is nothing to risk.
pub fn position_size_units(
    balance: Decimal,
    max_risk_per_trade: Decimal,
    entry_price: Decimal,
    stop_loss: Decimal,
) -> Decimal {
    let risk_per_unit = (entry_price - stop_loss).abs();
    if risk_per_unit <= Decimal::ZERO || balance <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (balance * max_risk_per_trade / risk_per_unit).floor()
}

// ---------------------------------------------------------------------------
// Daily trade budget
// ---------------------------------------------------------------------------

/// Executed-trade counter that resets on UTC day rollover.
#[derive(Debug, Clone)]
pub struct DailyTradeCounter {
    day: NaiveDate,
    executed: u32,
}

impl DailyTradeCounter {
    pub fn new() -> Self {
        Self {
            day: Utc::now().date_naive(),
            executed: 0,
        }
    }

    /// Trades executed so far today, rolling the window first if the UTC
    /// day has changed since the last call.
    pub fn executed_today(&mut self) -> u32 {
        self.roll_over(Utc::now().date_naive());
        self.executed
    }

    pub fn record(&mut self, trades: u32) {
        self.roll_over(Utc::now().date_naive());
        self.executed = self.executed.saturating_add(trades);
    }

    pub fn remaining(&mut self, limit: u32) -> u32 {
        limit.saturating_sub(self.executed_today())
    }

    fn roll_over(&mut self, today: NaiveDate) {
        if today != self.day {
            debug!(from = %self.day, to = %today, "daily trade counter reset");
            self.day = today;
            self.executed = 0;
        }
    }
}

impl Default for DailyTradeCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Trade planning
// ---------------------------------------------------------------------------

/// Apply the risk limits to one iteration's signals.
///
/// Signals are consumed in strategy order. Each surviving signal fans out to
/// every execution-capable account that still has a position slot, sized
/// against that account's own balance. Each emitted intent consumes one
/// trade from the daily budget; once the budget is spent the rest of the
/// signals are observed only.
pub fn plan_trades(
    signals: &[Signal],
    accounts: &[AccountView],
    risk: &RiskConfig,
    counter: &mut DailyTradeCounter,
) -> Vec<TradeIntent> {
    let mut budget = counter.remaining(risk.daily_trade_limit);
    let mut slots: Vec<u32> = accounts
        .iter()
        .map(|a| {
            if a.execution_capable {
                risk.max_positions.saturating_sub(a.open_position_count)
            } else {
                0
            }
        })
        .collect();

    let mut intents = Vec::new();
    'signals: for signal in signals {
        for (account, slots_left) in accounts.iter().zip(slots.iter_mut()) {
            if budget == 0 {
                debug!(
                    limit = risk.daily_trade_limit,
                    "daily trade budget spent, remaining signals observed only"
                );
                break 'signals;
            }
            if *slots_left == 0 {
                continue;
            }

            let units = position_size_units(
                account.balance,
                risk.max_risk_per_trade,
                signal.entry_price,
                signal.stop_loss,
            );
            if units <= Decimal::ZERO {
                continue;
            }

            intents.push(TradeIntent {
                signal_id: signal.id.clone(),
                account_id: account.id.clone(),
                instrument: signal.instrument.clone(),
                direction: signal.direction,
                units,
                entry_price: signal.entry_price,
                stop_loss: signal.stop_loss,
                take_profit: signal.take_profit,
            });
            *slots_left -= 1;
            budget -= 1;
        }
    }

    intents
}
