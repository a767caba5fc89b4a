//! The scan loop.
//!
//! One iteration: poll the config for changes, evaluate the execution gate
//! against the current environment and accounts, generate signals, route
//! them through the risk limits to the broker when the gate allows, and
//! publish a sanitized status snapshot. Everything inside an iteration is
//! synchronous; the interval sleep between iterations is the loop's only
//! suspension point, so reloads and shutdown never land mid-iteration.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broker::BrokerClient;
use crate::config::{env_string, ConfigMarker, ConfigStore, RuntimeConfig};
use crate::constants::ENV_TRADING_MODE;
use crate::core::gate::{self, GateInputs};
use crate::core::risk::{self, DailyTradeCounter};
use crate::errors::BotError;
use crate::snapshot::SnapshotWriter;
use crate::strategies::{Strategy, StrategyRegistry};
use crate::types::{AccountView, ExecutionRoute, StatusSnapshot, TradingMode};

pub struct Runner {
    store: ConfigStore,
    writer: SnapshotWriter,
    broker: Box<dyn BrokerClient>,
    registry: StrategyRegistry,
    config: RuntimeConfig,
    strategy: Box<dyn Strategy>,
    last_marker: Option<ConfigMarker>,
    counter: DailyTradeCounter,
    iteration: u64,
}

impl Runner {
    pub fn new(
        store: ConfigStore,
        writer: SnapshotWriter,
        broker: Box<dyn BrokerClient>,
    ) -> Result<Self, BotError> {
        let registry = StrategyRegistry::builtin();
        let config = store.load_or_init()?;
        let strategy = registry.build(&config.active_strategy_key)?;
        let last_marker = store.marker().ok();

        Ok(Self {
            store,
            writer,
            broker,
            registry,
            config,
            strategy,
            last_marker,
            counter: DailyTradeCounter::new(),
            iteration: 0,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Hot reload
    // -----------------------------------------------------------------------

    /// Pick up config file changes between iterations.
    ///
    /// A revision that fails to read or validate leaves the last known good
    /// config active and is logged once, not once per iteration: the marker
    /// advances either way, so only a further file change triggers another
    /// attempt.
    fn poll_reload(&mut self) {
        let marker = match self.store.marker() {
            Ok(marker) => marker,
            Err(e) => {
                warn!(error = %e, "config file unreadable, keeping active config");
                return;
            }
        };
        if self.last_marker.as_ref() == Some(&marker) {
            return;
        }

        match self.store.read() {
            Ok(next) => {
                for change in next.diff_summary(&self.config) {
                    info!(change = %change, "runtime config change");
                }
                if next.active_strategy_key != self.config.active_strategy_key {
                    match self.registry.build(&next.active_strategy_key) {
                        Ok(strategy) => {
                            info!(
                                from = %self.config.active_strategy_key,
                                to = %next.active_strategy_key,
                                "strategy switched"
                            );
                            self.strategy = strategy;
                        }
                        Err(e) => {
                            // read() validates the key, so this arm should
                            // be unreachable; refuse the revision if not.
                            warn!(error = %e, "reloaded strategy unavailable, keeping active config");
                            self.last_marker = Some(marker);
                            return;
                        }
                    }
                }
                self.config = next;
            }
            Err(e) => {
                warn!(error = %e, "config reload rejected, keeping last known good config");
            }
        }
        self.last_marker = Some(marker);
    }

    // -----------------------------------------------------------------------
    // One iteration
    // -----------------------------------------------------------------------

    /// Run one full scan iteration: reload, gate, scan, execute, publish.
    pub fn scan_once(&mut self) -> StatusSnapshot {
        let mode = TradingMode::parse(env_string(ENV_TRADING_MODE).as_deref());

        let accounts = match self.broker.list_accounts() {
            Ok(accounts) => accounts,
            Err(e) => {
                // No accounts means no capable account, which the gate
                // reads as a denial.
                warn!(error = %e, "account fetch failed");
                Vec::new()
            }
        };
        let inputs = GateInputs::from_env(mode, &accounts);
        self.iterate_with(mode, inputs, accounts)
    }

    /// The iteration body, after mode and gate inputs are fixed.
    fn iterate_with(
        &mut self,
        mode: TradingMode,
        inputs: GateInputs,
        accounts: Vec<AccountView>,
    ) -> StatusSnapshot {
        let started = Instant::now();
        let scan_timestamp = now_unix();
        self.iteration += 1;
        self.poll_reload();

        let decision = gate::decide(&inputs);
        let route = gate::execution_route(&decision, mode, inputs.paper_execution);

        let signals = match self.broker.market_snapshot() {
            Ok(market) => self.strategy.generate_signals(&market),
            Err(e) => {
                warn!(error = %e, "market snapshot failed, no signals this iteration");
                Vec::new()
            }
        };

        let mut executed = Vec::new();
        let mut pending_trades = Vec::new();
        let mut gate_denied = 0u32;

        match route {
            ExecutionRoute::Live | ExecutionRoute::Paper => {
                let intents =
                    risk::plan_trades(&signals, &accounts, &self.config.risk, &mut self.counter);
                // Planned intents consume daily budget whether or not the
                // broker accepts them; failures must not reopen the limit.
                self.counter.record(intents.len() as u32);

                for intent in intents {
                    match self.broker.execute(&intent) {
                        Ok(report) => {
                            info!(
                                signal = %report.signal_id,
                                account = %report.account_id,
                                instrument = %report.instrument,
                                direction = %report.direction,
                                units = %report.units,
                                fill = %report.fill_price,
                                route = %route,
                                "trade executed"
                            );
                            executed.push(report);
                        }
                        Err(e) => {
                            warn!(
                                signal = %intent.signal_id,
                                account = %intent.account_id,
                                error = %e,
                                "execution failed, intent left pending"
                            );
                            pending_trades.push(intent);
                        }
                    }
                }
            }
            ExecutionRoute::SignalsOnly => {
                gate_denied = signals.len() as u32;
                if !signals.is_empty() {
                    let reason = match mode {
                        TradingMode::Live => decision
                            .denial_reason()
                            .unwrap_or_else(|| "execution gate denied".into()),
                        TradingMode::Paper => "paper execution is disabled".into(),
                    };
                    warn!(
                        signals = signals.len(),
                        reason = %reason,
                        "signals generated but kept from the execution path"
                    );
                }
            }
        }

        let open_positions = match self.broker.open_positions() {
            Ok(positions) => positions,
            Err(e) => {
                warn!(error = %e, "open position fetch failed");
                Vec::new()
            }
        };

        let snapshot = StatusSnapshot {
            mode,
            execution_enabled: route == ExecutionRoute::Live,
            execution_route: route,
            accounts_loaded: accounts.len() as u32,
            accounts_execution_capable: accounts
                .iter()
                .filter(|a| a.execution_capable)
                .count() as u32,
            active_strategy_key: self.config.active_strategy_key.clone(),
            scan_interval_seconds: self.config.scan_interval_seconds,
            iteration: self.iteration,
            last_scan_timestamp: scan_timestamp,
            last_scan_duration_ms: started.elapsed().as_millis() as u64,
            last_signals_generated: signals.len() as u32,
            last_executed_count: executed.len() as u32,
            last_gate_denied: gate_denied,
            pending_signals: signals,
            pending_trades,
            accounts,
            open_positions,
        };

        if let Err(e) = self.writer.write(snapshot.clone()) {
            warn!(error = %e, "status snapshot write failed");
        }

        info!(
            iteration = self.iteration,
            mode = %mode,
            route = %route,
            signals = snapshot.last_signals_generated,
            executed = snapshot.last_executed_count,
            gate_denied = snapshot.last_gate_denied,
            duration_ms = snapshot.last_scan_duration_ms,
            "scan iteration complete"
        );

        snapshot
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Run scan iterations until the CancellationToken is cancelled.
    ///
    /// The first iteration runs immediately so a status snapshot exists
    /// right after startup. The sleep duration is re-read from the active
    /// config every pass, so an interval change takes effect on the next
    /// iteration without restarting the loop.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            strategy = %self.config.active_strategy_key,
            interval_s = self.config.scan_interval_seconds,
            "scan loop started"
        );

        loop {
            self.scan_once();

            let interval = Duration::from_secs(self.config.scan_interval_seconds);
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("scan loop shutting down");
                    break;
                }
                () = tokio::time::sleep(interval) => {}
            }
        }
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
