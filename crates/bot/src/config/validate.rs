use rust_decimal::Decimal;

use super::types::RuntimeConfig;
use crate::constants::{
    CONFIG_SCHEMA_VERSION, MAX_DAILY_TRADE_LIMIT, MAX_MAX_POSITIONS, MAX_RISK_PER_TRADE_CAP,
    MAX_SCAN_INTERVAL_SECONDS, MIN_DAILY_TRADE_LIMIT, MIN_MAX_POSITIONS,
    MIN_SCAN_INTERVAL_SECONDS,
};
use crate::errors::{BotError, ValidationErrors};
use crate::redaction;
use crate::strategies::StrategyRegistry;

/// Validate invariants serde alone cannot enforce: bounds, registry
/// membership, and the no-secrets rule. Collects every violation before
/// failing so the operator fixes one rejection, not five in a row.
pub fn validate_config(
    config: &RuntimeConfig,
    registry: &StrategyRegistry,
) -> Result<(), BotError> {
    let mut errors: Vec<String> = Vec::new();

    validate_schema(config, &mut errors);
    validate_strategy_key(config, registry, &mut errors);
    validate_interval(config, &mut errors);
    validate_risk(config, &mut errors);
    validate_no_secret_fields(config, &mut errors);

    ValidationErrors(errors).into_result()
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

fn validate_schema(config: &RuntimeConfig, errors: &mut Vec<String>) {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        errors.push(format!(
            "schema_version ({}) is not supported (expected {})",
            config.schema_version, CONFIG_SCHEMA_VERSION
        ));
    }
}

// ---------------------------------------------------------------------------
// Strategy key
// ---------------------------------------------------------------------------

fn validate_strategy_key(
    config: &RuntimeConfig,
    registry: &StrategyRegistry,
    errors: &mut Vec<String>,
) {
    if config.active_strategy_key.is_empty() {
        errors.push("active_strategy_key is empty".into());
        return;
    }
    if !registry.contains(&config.active_strategy_key) {
        errors.push(format!(
            "active_strategy_key '{}' is not in the strategy catalog (known: {})",
            config.active_strategy_key,
            registry.known_keys().join(", ")
        ));
    }
}

// ---------------------------------------------------------------------------
// Scan interval
// ---------------------------------------------------------------------------

fn validate_interval(config: &RuntimeConfig, errors: &mut Vec<String>) {
    let interval = config.scan_interval_seconds;
    if !(MIN_SCAN_INTERVAL_SECONDS..=MAX_SCAN_INTERVAL_SECONDS).contains(&interval) {
        errors.push(format!(
            "scan_interval_seconds ({interval}) must be in [{MIN_SCAN_INTERVAL_SECONDS}, {MAX_SCAN_INTERVAL_SECONDS}]"
        ));
    }
}

// ---------------------------------------------------------------------------
// Risk block
// ---------------------------------------------------------------------------

fn validate_risk(config: &RuntimeConfig, errors: &mut Vec<String>) {
    let risk = &config.risk;

    if risk.max_risk_per_trade <= Decimal::ZERO || risk.max_risk_per_trade > MAX_RISK_PER_TRADE_CAP
    {
        errors.push(format!(
            "risk.max_risk_per_trade ({}) must be in (0, {}]",
            risk.max_risk_per_trade, MAX_RISK_PER_TRADE_CAP
        ));
    }

    if !(MIN_MAX_POSITIONS..=MAX_MAX_POSITIONS).contains(&risk.max_positions) {
        errors.push(format!(
            "risk.max_positions ({}) must be in [{MIN_MAX_POSITIONS}, {MAX_MAX_POSITIONS}]",
            risk.max_positions
        ));
    }

    if !(MIN_DAILY_TRADE_LIMIT..=MAX_DAILY_TRADE_LIMIT).contains(&risk.daily_trade_limit) {
        errors.push(format!(
            "risk.daily_trade_limit ({}) must be in [{MIN_DAILY_TRADE_LIMIT}, {MAX_DAILY_TRADE_LIMIT}]",
            risk.daily_trade_limit
        ));
    }
}

// ---------------------------------------------------------------------------
// No secrets
// ---------------------------------------------------------------------------

/// The config file sits outside the trust boundary (dashboards read it, the
/// control plane serves it verbatim), so credentials must be rejected at
/// write time, not filtered at read time.
fn validate_no_secret_fields(config: &RuntimeConfig, errors: &mut Vec<String>) {
    match serde_json::to_value(config) {
        Ok(doc) => redaction::scan_value_for_secrets(&doc, "", errors),
        Err(e) => errors.push(format!("config could not be serialized for secret scan: {e}")),
    }
}
