use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

/// Runtime config file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "runtime_config.json";

/// Status snapshot file name inside the data directory.
pub const STATUS_FILE_NAME: &str = "status.json";

/// Subdirectory for timestamped config backups.
pub const CONFIG_BACKUP_DIR: &str = "config_backups";

/// Rolling log file prefix (tracing-appender appends the date).
pub const LOG_FILE_PREFIX: &str = "bot.log";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_LOG_DIR: &str = "logs";

// ---------------------------------------------------------------------------
// Environment variables
// ---------------------------------------------------------------------------

/// `paper` (default) or `live`. Anything else is treated as paper.
pub const ENV_TRADING_MODE: &str = "TRADING_MODE";

/// First live-trading consent flag. Must be truthy for live execution.
pub const ENV_LIVE_TRADING: &str = "LIVE_TRADING";

/// Second, independent live-trading consent flag.
pub const ENV_LIVE_TRADING_CONFIRM: &str = "LIVE_TRADING_CONFIRM";

/// Enables simulated fills in paper mode. Off by default (signals only).
pub const ENV_PAPER_EXECUTION: &str = "PAPER_EXECUTION";

/// Bearer token required by mutating control-plane endpoints.
pub const ENV_CONTROL_AUTH_TOKEN: &str = "CONTROL_AUTH_TOKEN";

pub const ENV_DATA_DIR: &str = "BOT_DATA_DIR";
pub const ENV_LOG_DIR: &str = "BOT_LOG_DIR";
pub const ENV_CONTROL_LISTEN_ADDR: &str = "CONTROL_LISTEN_ADDR";
pub const ENV_CONTROL_PLANE_AUTOSTART: &str = "CONTROL_PLANE_AUTOSTART";
pub const ENV_PAPER_ACCOUNTS: &str = "PAPER_ACCOUNTS";
pub const ENV_PAPER_STARTING_BALANCE: &str = "PAPER_STARTING_BALANCE";
pub const ENV_STATUS_STALE_GRACE_SECS: &str = "STATUS_STALE_GRACE_SECS";

// ---------------------------------------------------------------------------
// Config bounds
// ---------------------------------------------------------------------------

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

pub const MIN_SCAN_INTERVAL_SECONDS: u64 = 5;
pub const MAX_SCAN_INTERVAL_SECONDS: u64 = 3_600;

/// Upper bound on the balance fraction risked per trade (5%).
pub const MAX_RISK_PER_TRADE_CAP: Decimal = dec!(0.05);

pub const MIN_MAX_POSITIONS: u32 = 1;
pub const MAX_MAX_POSITIONS: u32 = 20;

pub const MIN_DAILY_TRADE_LIMIT: u32 = 1;
pub const MAX_DAILY_TRADE_LIMIT: u32 = 200;

// ---------------------------------------------------------------------------
// Default runtime config values
// ---------------------------------------------------------------------------

pub const DEFAULT_STRATEGY_KEY: &str = "momentum";
pub const DEFAULT_SCAN_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_MAX_RISK_PER_TRADE: Decimal = dec!(0.01);
pub const DEFAULT_MAX_POSITIONS: u32 = 5;
pub const DEFAULT_DAILY_TRADE_LIMIT: u32 = 10;

// ---------------------------------------------------------------------------
// Status freshness
// ---------------------------------------------------------------------------

/// A snapshot older than `2 * scan_interval + grace` is reported stale.
pub const STALENESS_INTERVAL_MULTIPLIER: u64 = 2;
pub const DEFAULT_STALE_GRACE_SECONDS: u64 = 10;

// ---------------------------------------------------------------------------
// Redaction
// ---------------------------------------------------------------------------

/// Replacement for secret-shaped values in logs and snapshots.
pub const REDACTION_MASK: &str = "[REDACTED]";

// ---------------------------------------------------------------------------
// Paper broker defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_PAPER_ACCOUNTS: u32 = 2;
pub const DEFAULT_PAPER_STARTING_BALANCE: Decimal = dec!(10_000);
pub const DEFAULT_PAPER_SLIPPAGE_BPS: i64 = 3;

/// Candle history synthesized at broker startup so strategies can warm up.
pub const PAPER_BOOTSTRAP_CANDLES: usize = 120;

// ---------------------------------------------------------------------------
// Control plane
// ---------------------------------------------------------------------------

/// Loopback by default; exposing the control plane is an explicit choice.
pub const DEFAULT_CONTROL_LISTEN_ADDR: &str = "127.0.0.1:8787";

// ---------------------------------------------------------------------------
// Log relay
// ---------------------------------------------------------------------------

/// Bounded broadcast capacity per relay; slow subscribers drop oldest lines.
pub const RELAY_CHANNEL_CAPACITY: usize = 1_024;

/// How often the relay polls the log file for new lines.
pub const RELAY_POLL_INTERVAL_MS: u64 = 250;
