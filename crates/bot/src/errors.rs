use std::fmt;

use thiserror::Error;

/// Typed error hierarchy for the swing bot.
///
/// Library-internal errors use specific variants; application code wraps with
/// `anyhow::Context` for propagation.
#[derive(Error, Debug)]
pub enum BotError {
    // -- Configuration ------------------------------------------------------
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("configuration error: {0}")]
    Config(String),

    // -- Strategy -----------------------------------------------------------
    #[error("unknown strategy key: '{key}'")]
    UnknownStrategy { key: String },

    // -- Execution ----------------------------------------------------------
    #[error("execution blocked: {reason}")]
    ExecutionBlocked { reason: String },

    #[error("broker error: {reason}")]
    Broker { reason: String },

    // -- Status -------------------------------------------------------------
    #[error("status snapshot unavailable: {reason}")]
    SnapshotUnavailable { reason: String },

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Every constraint a rejected config violated, collected in one pass so the
/// operator sees the full list instead of fixing errors one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Consume accumulated violations: `Ok(())` when empty, otherwise the
    /// full enumerated error.
    pub fn into_result(self) -> Result<(), BotError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(BotError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "configuration validation failed ({} error{}):\n  - {}",
            self.0.len(),
            if self.0.len() == 1 { "" } else { "s" },
            self.0.join("\n  - ")
        )
    }
}

impl From<Vec<String>> for ValidationErrors {
    fn from(errors: Vec<String>) -> Self {
        Self(errors)
    }
}
