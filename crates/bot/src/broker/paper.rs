//! Simulated broker backed by a seeded random walk.
//!
//! Serves the same three needs a real brokerage adapter would: account
//! views, candle history, and order fills with adverse slippage. Prices
//! follow a per-instrument bounded random walk so strategies see plausible
//! crosses and breakouts; a fixed seed makes a whole session reproducible.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use super::BrokerClient;
use crate::config::{env_bool, env_decimal, env_parse};
use crate::constants::{
    DEFAULT_PAPER_ACCOUNTS, DEFAULT_PAPER_SLIPPAGE_BPS, DEFAULT_PAPER_STARTING_BALANCE,
    ENV_PAPER_ACCOUNTS, ENV_PAPER_EXECUTION, ENV_PAPER_STARTING_BALANCE,
    PAPER_BOOTSTRAP_CANDLES,
};
use crate::errors::BotError;
use crate::types::{
    AccountView, Candle, Direction, ExecutionReport, MarketSnapshot, Position, TradeIntent,
};

/// Tradable universe with starting prices, covering every instrument the
/// built-in strategies reference.
const UNIVERSE: &[(&str, Decimal)] = &[
    ("AUD_USD", dec!(0.6600)),
    ("EUR_USD", dec!(1.1000)),
    ("GBP_USD", dec!(1.2700)),
    ("USD_JPY", dec!(155.00)),
    ("XAU_USD", dec!(2400.00)),
];

const CANDLE_INTERVAL_SECONDS: i64 = 60;
/// Oldest candles are dropped past this depth to bound memory.
const MAX_HISTORY: usize = 480;
/// Per-candle move bound in basis points.
const MAX_STEP_BPS: i64 = 25;

struct PaperPosition {
    position: Position,
    stop_loss: Decimal,
    take_profit: Decimal,
}

struct PaperAccount {
    id: String,
    alias: String,
    balance: Decimal,
    positions: Vec<PaperPosition>,
}

pub struct PaperBroker {
    rng: StdRng,
    series: BTreeMap<String, Vec<Candle>>,
    accounts: Vec<PaperAccount>,
    slippage_bps: i64,
    execution_enabled: bool,
    next_timestamp: i64,
}

impl PaperBroker {
    pub fn new(
        account_count: u32,
        starting_balance: Decimal,
        execution_enabled: bool,
        seed: u64,
    ) -> Self {
        let accounts = (1..=account_count.clamp(1, 16))
            .map(|i| PaperAccount {
                id: format!("paper-{i:03}"),
                alias: format!("sim-{i}"),
                balance: starting_balance,
                positions: Vec::new(),
            })
            .collect();

        let base_time = now_unix() - (PAPER_BOOTSTRAP_CANDLES as i64) * CANDLE_INTERVAL_SECONDS;
        let mut broker = Self {
            rng: StdRng::seed_from_u64(seed),
            series: BTreeMap::new(),
            accounts,
            slippage_bps: DEFAULT_PAPER_SLIPPAGE_BPS,
            execution_enabled,
            next_timestamp: base_time + (PAPER_BOOTSTRAP_CANDLES as i64) * CANDLE_INTERVAL_SECONDS,
        };

        for (instrument, base) in UNIVERSE {
            let mut close = *base;
            let mut candles = Vec::with_capacity(PAPER_BOOTSTRAP_CANDLES);
            for i in 0..PAPER_BOOTSTRAP_CANDLES {
                let timestamp = base_time + (i as i64) * CANDLE_INTERVAL_SECONDS;
                let candle = broker.next_candle(close, timestamp);
                close = candle.close;
                candles.push(candle);
            }
            broker.series.insert((*instrument).into(), candles);
        }

        info!(
            accounts = broker.accounts.len(),
            balance = %starting_balance,
            execution_enabled,
            "paper broker ready"
        );
        broker
    }

    /// Build from `PAPER_*` env vars. Execution capability comes from
    /// `PAPER_EXECUTION` and defaults to off.
    pub fn from_env() -> Self {
        Self::new(
            env_parse::<u32>(ENV_PAPER_ACCOUNTS).unwrap_or(DEFAULT_PAPER_ACCOUNTS),
            env_decimal(ENV_PAPER_STARTING_BALANCE).unwrap_or(DEFAULT_PAPER_STARTING_BALANCE),
            env_bool(ENV_PAPER_EXECUTION).unwrap_or(false),
            rand::random(),
        )
    }

    fn next_candle(&mut self, previous_close: Decimal, timestamp: i64) -> Candle {
        let step_bps = self.rng.gen_range(-MAX_STEP_BPS..=MAX_STEP_BPS);
        let wick_bps = self.rng.gen_range(0..=10i64);
        let volume = self.rng.gen_range(500..5_000i64);

        let open = previous_close;
        let close = open * (Decimal::ONE + Decimal::new(step_bps, 4));
        let wick = Decimal::new(wick_bps, 4);

        Candle {
            timestamp,
            open,
            high: open.max(close) * (Decimal::ONE + wick),
            low: open.min(close) * (Decimal::ONE - wick),
            close,
            volume: Decimal::from(volume),
        }
    }

    /// Step every instrument one candle forward, then mark open positions
    /// to market and close any whose stop or target was crossed.
    fn advance(&mut self) {
        let timestamp = self.next_timestamp;
        self.next_timestamp += CANDLE_INTERVAL_SECONDS;

        let instruments: Vec<String> = self.series.keys().cloned().collect();
        for instrument in instruments {
            let previous_close = self
                .series
                .get(&instrument)
                .and_then(|candles| candles.last())
                .map(|c| c.close)
                .unwrap_or(Decimal::ONE);
            let candle = self.next_candle(previous_close, timestamp);
            if let Some(candles) = self.series.get_mut(&instrument) {
                candles.push(candle);
                if candles.len() > MAX_HISTORY {
                    candles.remove(0);
                }
            }
        }

        self.mark_positions();
    }

    fn mark_positions(&mut self) {
        let series = &self.series;
        for account in &mut self.accounts {
            let mut kept = Vec::with_capacity(account.positions.len());
            for mut paper in account.positions.drain(..) {
                let Some(close) = series
                    .get(&paper.position.instrument)
                    .and_then(|candles| candles.last())
                    .map(|c| c.close)
                else {
                    kept.push(paper);
                    continue;
                };

                match exit_level(paper.position.direction, paper.stop_loss, paper.take_profit, close)
                {
                    Some(level) => {
                        let realized = position_pnl(
                            paper.position.direction,
                            paper.position.avg_price,
                            paper.position.units,
                            level,
                        );
                        account.balance += realized;
                        info!(
                            account = %account.id,
                            instrument = %paper.position.instrument,
                            exit = %level,
                            pnl = %realized,
                            "paper position closed"
                        );
                    }
                    None => {
                        paper.position.unrealized_pnl = position_pnl(
                            paper.position.direction,
                            paper.position.avg_price,
                            paper.position.units,
                            close,
                        );
                        kept.push(paper);
                    }
                }
            }
            account.positions = kept;
        }
    }
}

impl BrokerClient for PaperBroker {
    fn list_accounts(&self) -> Result<Vec<AccountView>, BotError> {
        Ok(self
            .accounts
            .iter()
            .map(|account| AccountView {
                id: account.id.clone(),
                alias: account.alias.clone(),
                currency: "USD".into(),
                balance: account.balance,
                margin_available: account.balance,
                execution_capable: self.execution_enabled,
                open_position_count: account.positions.len() as u32,
            })
            .collect())
    }

    fn market_snapshot(&mut self) -> Result<MarketSnapshot, BotError> {
        self.advance();
        Ok(MarketSnapshot {
            fetched_at: now_unix(),
            series: self.series.clone(),
        })
    }

    fn execute(&mut self, intent: &TradeIntent) -> Result<ExecutionReport, BotError> {
        if !self.execution_enabled {
            return Err(BotError::ExecutionBlocked {
                reason: "paper execution is disabled".into(),
            });
        }

        // Slippage is always adverse: longs fill above the quote, shorts below.
        let slip = Decimal::new(self.slippage_bps, 4);
        let fill_price = match intent.direction {
            Direction::Long => intent.entry_price * (Decimal::ONE + slip),
            Direction::Short => intent.entry_price * (Decimal::ONE - slip),
        };
        let executed_at = now_unix();

        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.id == intent.account_id)
            .ok_or_else(|| BotError::Broker {
                reason: format!("unknown account '{}'", intent.account_id),
            })?;

        account.positions.push(PaperPosition {
            position: Position {
                account_id: intent.account_id.clone(),
                instrument: intent.instrument.clone(),
                direction: intent.direction,
                units: intent.units,
                avg_price: fill_price,
                unrealized_pnl: Decimal::ZERO,
                opened_at: executed_at,
            },
            stop_loss: intent.stop_loss,
            take_profit: intent.take_profit,
        });

        debug!(
            account = %intent.account_id,
            instrument = %intent.instrument,
            direction = %intent.direction,
            units = %intent.units,
            fill = %fill_price,
            "paper fill"
        );

        Ok(ExecutionReport {
            signal_id: intent.signal_id.clone(),
            account_id: intent.account_id.clone(),
            instrument: intent.instrument.clone(),
            direction: intent.direction,
            units: intent.units,
            fill_price,
            executed_at,
        })
    }

    fn open_positions(&self) -> Result<Vec<Position>, BotError> {
        Ok(self
            .accounts
            .iter()
            .flat_map(|account| account.positions.iter().map(|p| p.position.clone()))
            .collect())
    }
}

/// Price at which a position exits, if the candle close crossed its stop or
/// target. Stops win over targets when both are crossed in one candle.
fn exit_level(
    direction: Direction,
    stop_loss: Decimal,
    take_profit: Decimal,
    close: Decimal,
) -> Option<Decimal> {
    match direction {
        Direction::Long if close <= stop_loss => Some(stop_loss),
        Direction::Long if close >= take_profit => Some(take_profit),
        Direction::Short if close >= stop_loss => Some(stop_loss),
        Direction::Short if close <= take_profit => Some(take_profit),
        _ => None,
    }
}

fn position_pnl(direction: Direction, avg_price: Decimal, units: Decimal, price: Decimal) -> Decimal {
    match direction {
        Direction::Long => (price - avg_price) * units,
        Direction::Short => (avg_price - price) * units,
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
