//! Strategy catalog and the closed capability interface.
//!
//! The catalog is built once at process start from a fixed, reviewed list.
//! A config value can select among these entries and nothing else; there is
//! no dynamic loading path, so an operator-writable file can never cause
//! arbitrary code to run.

pub mod gold;
pub mod indicators;
pub mod meanrev;
pub mod momentum;

use serde::{Deserialize, Serialize};

use crate::errors::BotError;
use crate::types::{MarketSnapshot, Signal};

/// Coarse risk tag shown in the catalog; informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Conservative,
    Balanced,
    Aggressive,
}

/// Immutable catalog entry describing one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyDescriptor {
    pub key: String,
    pub name: String,
    pub instruments: Vec<String>,
    pub risk_profile: RiskProfile,
}

/// The only capability a strategy has: turn market history into signals.
///
/// `&mut self` so implementations can keep per-run state (last cross
/// direction, cooldown bars) without interior mutability.
pub trait Strategy: Send {
    fn key(&self) -> &str;

    fn generate_signals(&mut self, market: &MarketSnapshot) -> Vec<Signal>;
}

struct RegistryEntry {
    descriptor: StrategyDescriptor,
    build: fn() -> Box<dyn Strategy>,
}

/// Fixed mapping from strategy key to descriptor and constructor.
pub struct StrategyRegistry {
    entries: Vec<RegistryEntry>,
}

impl StrategyRegistry {
    /// The reviewed built-in catalog.
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                RegistryEntry {
                    descriptor: momentum::descriptor(),
                    build: || Box::new(momentum::Momentum::new()),
                },
                RegistryEntry {
                    descriptor: gold::descriptor(),
                    build: || Box::new(gold::GoldBreakout::new()),
                },
                RegistryEntry {
                    descriptor: meanrev::descriptor(),
                    build: || Box::new(meanrev::MeanReversion::new()),
                },
            ],
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.descriptor.key == key)
    }

    pub fn get(&self, key: &str) -> Result<&StrategyDescriptor, BotError> {
        self.entries
            .iter()
            .map(|e| &e.descriptor)
            .find(|d| d.key == key)
            .ok_or_else(|| BotError::UnknownStrategy { key: key.to_string() })
    }

    pub fn list(&self) -> Vec<&StrategyDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    pub fn known_keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.descriptor.key.clone())
            .collect()
    }

    /// Instantiate the strategy behind a key.
    pub fn build(&self, key: &str) -> Result<Box<dyn Strategy>, BotError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.key == key)
            .ok_or_else(|| BotError::UnknownStrategy { key: key.to_string() })?;
        Ok((entry.build)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_contents() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.known_keys(), vec!["momentum", "gold", "meanrev"]);
        assert!(registry.contains("momentum"));
        assert!(!registry.contains("martingale"));
    }

    #[test]
    fn test_get_unknown_key_is_typed_error() {
        let registry = StrategyRegistry::builtin();
        let err = registry.get("martingale").unwrap_err();
        assert!(matches!(err, BotError::UnknownStrategy { .. }));
        assert!(err.to_string().contains("martingale"));
    }

    #[test]
    fn test_build_produces_matching_key() {
        let registry = StrategyRegistry::builtin();
        for key in registry.known_keys() {
            let strategy = registry.build(&key).unwrap();
            assert_eq!(strategy.key(), key);
        }
    }

    #[test]
    fn test_descriptors_have_instruments() {
        let registry = StrategyRegistry::builtin();
        for descriptor in registry.list() {
            assert!(
                !descriptor.instruments.is_empty(),
                "{} has no instruments",
                descriptor.key
            );
        }
    }
}
