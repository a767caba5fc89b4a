use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_SCHEMA_VERSION, DEFAULT_DAILY_TRADE_LIMIT, DEFAULT_MAX_POSITIONS,
    DEFAULT_MAX_RISK_PER_TRADE, DEFAULT_SCAN_INTERVAL_SECONDS, DEFAULT_STRATEGY_KEY,
};

/// Operator-editable runtime configuration.
///
/// This is the document behind the hot-reload protocol: the scan loop polls
/// it for changes, the control plane mutates it on operator command. Unknown
/// fields are rejected at parse time so a typo'd (or smuggled) field can
/// never ride along silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub active_strategy_key: String,
    pub scan_interval_seconds: u64,
    pub risk: RiskConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    /// Fraction of account balance risked per trade.
    #[serde(with = "rust_decimal::serde::str")]
    pub max_risk_per_trade: Decimal,
    /// Cap on concurrently open positions across all accounts.
    pub max_positions: u32,
    /// Cap on executed trades per UTC day.
    pub daily_trade_limit: u32,
}

fn default_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            active_strategy_key: DEFAULT_STRATEGY_KEY.to_string(),
            scan_interval_seconds: DEFAULT_SCAN_INTERVAL_SECONDS,
            risk: RiskConfig::default(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_risk_per_trade: DEFAULT_MAX_RISK_PER_TRADE,
            max_positions: DEFAULT_MAX_POSITIONS,
            daily_trade_limit: DEFAULT_DAILY_TRADE_LIMIT,
        }
    }
}

impl RuntimeConfig {
    /// Human-readable field diff against a previous config, for the reload
    /// log. Empty when nothing changed.
    pub fn diff_summary(&self, previous: &Self) -> Vec<String> {
        let mut changes = Vec::new();
        if self.active_strategy_key != previous.active_strategy_key {
            changes.push(format!(
                "strategy: {} \u{2192} {}",
                previous.active_strategy_key, self.active_strategy_key
            ));
        }
        if self.scan_interval_seconds != previous.scan_interval_seconds {
            changes.push(format!(
                "scan_interval: {}s \u{2192} {}s",
                previous.scan_interval_seconds, self.scan_interval_seconds
            ));
        }
        if self.risk.max_risk_per_trade != previous.risk.max_risk_per_trade {
            changes.push(format!(
                "risk.max_risk_per_trade: {} \u{2192} {}",
                previous.risk.max_risk_per_trade, self.risk.max_risk_per_trade
            ));
        }
        if self.risk.max_positions != previous.risk.max_positions {
            changes.push(format!(
                "risk.max_positions: {} \u{2192} {}",
                previous.risk.max_positions, self.risk.max_positions
            ));
        }
        if self.risk.daily_trade_limit != previous.risk.daily_trade_limit {
            changes.push(format!(
                "risk.daily_trade_limit: {} \u{2192} {}",
                previous.risk.daily_trade_limit, self.risk.daily_trade_limit
            ));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_shape() {
        let config = RuntimeConfig::default();
        assert_eq!(config.schema_version, 1);
        assert_eq!(config.active_strategy_key, "momentum");
        assert_eq!(config.scan_interval_seconds, 60);
        assert_eq!(config.risk.max_risk_per_trade, dec!(0.01));
        assert_eq!(config.risk.max_positions, 5);
        assert_eq!(config.risk.daily_trade_limit, 10);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{
            "schema_version": 1,
            "active_strategy_key": "momentum",
            "scan_interval_seconds": 60,
            "risk": { "max_risk_per_trade": "0.01", "max_positions": 5, "daily_trade_limit": 10 },
            "oanda_api_key": "abc"
        }"#;
        let err = serde_json::from_str::<RuntimeConfig>(json).unwrap_err();
        assert!(err.to_string().contains("oanda_api_key"));
    }

    #[test]
    fn test_schema_version_defaults_when_absent() {
        let json = r#"{
            "active_strategy_key": "gold",
            "scan_interval_seconds": 30,
            "risk": { "max_risk_per_trade": "0.02", "max_positions": 3, "daily_trade_limit": 5 }
        }"#;
        let config: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.schema_version, 1);
        assert_eq!(config.active_strategy_key, "gold");
    }

    #[test]
    fn test_diff_summary_lists_changed_fields_only() {
        let previous = RuntimeConfig::default();
        let mut next = previous.clone();
        next.active_strategy_key = "gold".into();
        next.scan_interval_seconds = 30;

        let changes = next.diff_summary(&previous);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], "strategy: momentum \u{2192} gold");
        assert_eq!(changes[1], "scan_interval: 60s \u{2192} 30s");
        assert!(next.diff_summary(&next).is_empty());
    }
}
