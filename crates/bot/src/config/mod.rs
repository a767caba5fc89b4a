pub mod types;
pub mod validate;

pub use types::*;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::constants::{CONFIG_BACKUP_DIR, CONFIG_FILE_NAME};
use crate::errors::{BotError, ValidationErrors};
use crate::redaction;
use crate::strategies::StrategyRegistry;

/// Result of a config write: whether the file on disk actually changed.
///
/// Byte-identical rewrites are skipped entirely so the scan loop's reload
/// check never fires for a no-op save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Fingerprint of the config file on disk, used by the scan loop to detect
/// out-of-band edits. The content hash is authoritative; the mtime is kept
/// for log messages and cheap pre-checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMarker {
    pub modified: Option<SystemTime>,
    pub sha256: String,
}

/// Owner of the single runtime config file.
///
/// Every mutation goes through [`ConfigStore::write`], which validates the
/// candidate, backs up the previous version, and replaces the file with a
/// write-to-temp-then-rename so concurrent readers never observe a torn
/// file. The bot process and the control plane each hold their own store
/// pointed at the same path; the file is the only shared state between them.
pub struct ConfigStore {
    path: PathBuf,
    registry: StrategyRegistry,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            registry: StrategyRegistry::builtin(),
        }
    }

    /// Store for the standard config file name inside a data directory.
    pub fn in_data_dir(dir: &Path) -> Self {
        Self::new(dir.join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config, or create it with defaults on first run.
    ///
    /// An existing file that fails to parse or validate is an error here:
    /// at startup the operator must fix it, unlike mid-run reloads where
    /// the loop keeps the last known good config.
    pub fn load_or_init(&self) -> Result<RuntimeConfig, BotError> {
        if self.path.exists() {
            return self.read();
        }

        let config = RuntimeConfig::default();
        self.write(&config)?;
        info!(path = %self.path.display(), "created default runtime config");
        Ok(config)
    }

    /// Read and fully validate the config file.
    pub fn read(&self) -> Result<RuntimeConfig, BotError> {
        let bytes = std::fs::read(&self.path)?;
        let config: RuntimeConfig = serde_json::from_slice(&bytes)?;
        validate::validate_config(&config, &self.registry)?;
        Ok(config)
    }

    /// Validate and atomically write the config.
    ///
    /// Returns [`WriteOutcome::Unchanged`] without touching the file when
    /// the rendered bytes match what is already on disk.
    pub fn write(&self, config: &RuntimeConfig) -> Result<WriteOutcome, BotError> {
        validate::validate_config(config, &self.registry)?;

        let mut rendered = serde_json::to_vec_pretty(config)?;
        rendered.push(b'\n');

        let previous = match std::fs::read(&self.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if previous.as_deref() == Some(rendered.as_slice()) {
            debug!(path = %self.path.display(), "config unchanged, write skipped");
            return Ok(WriteOutcome::Unchanged);
        }

        if previous.is_some() {
            self.backup_previous();
        }

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        // Temp file in the same directory so the final rename stays on one
        // filesystem and is atomic.
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&rendered)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        info!(path = %self.path.display(), "runtime config written");
        Ok(WriteOutcome::Written)
    }

    /// Merge a JSON patch into the current config and write the result.
    ///
    /// Objects merge key-wise (so `{"risk": {"max_positions": 9}}` leaves
    /// the other risk fields alone); everything else replaces. The merged
    /// document must still parse as a complete config, so unknown fields
    /// and type mismatches are rejected before anything is written.
    pub fn apply_patch(&self, patch: &Value) -> Result<(RuntimeConfig, WriteOutcome), BotError> {
        if !patch.is_object() {
            return Err(BotError::Validation(ValidationErrors(vec![
                "patch must be a JSON object".into(),
            ])));
        }

        // Scan the raw patch before the typed parse so a credential in an
        // unknown field is rejected as a credential, not as a schema error.
        let mut violations = Vec::new();
        redaction::scan_value_for_secrets(patch, "", &mut violations);
        ValidationErrors(violations).into_result()?;

        let current = self.read()?;
        let mut merged = serde_json::to_value(&current)?;
        deep_merge(&mut merged, patch);

        let candidate: RuntimeConfig = serde_json::from_value(merged).map_err(|e| {
            BotError::Validation(ValidationErrors(vec![format!(
                "patch produced an invalid config: {e}"
            )]))
        })?;

        let outcome = self.write(&candidate)?;
        Ok((candidate, outcome))
    }

    /// Fingerprint the file currently on disk.
    pub fn marker(&self) -> Result<ConfigMarker, BotError> {
        let bytes = std::fs::read(&self.path)?;
        let modified = std::fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        Ok(ConfigMarker {
            modified,
            sha256: sha256_hex(&bytes),
        })
    }

    /// Copy the current file into the backup directory, best effort. A
    /// failed backup is logged and never blocks the write itself.
    fn backup_previous(&self) {
        let Some(parent) = self.path.parent() else {
            return;
        };
        let backup_dir = parent.join(CONFIG_BACKUP_DIR);
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        let backup_path = backup_dir.join(format!("runtime_config.{stamp}.json"));

        let result = std::fs::create_dir_all(&backup_dir)
            .and_then(|_| std::fs::copy(&self.path, &backup_path));
        match result {
            Ok(_) => debug!(path = %backup_path.display(), "previous config backed up"),
            Err(e) => warn!(error = %e, "config backup failed, continuing with write"),
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Recursive JSON merge: objects merge key-wise, everything else replaces.
fn deep_merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                deep_merge(
                    base_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

// ---------------------------------------------------------------------------
// Environment variable helpers
// ---------------------------------------------------------------------------

/// Read a non-empty env var as a `String`.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var as a bool (`true`, `1`, `yes` → true).
pub fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Read a non-empty env var and parse it as `T`.
pub fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Read a non-empty env var and parse it as `Decimal`.
pub fn env_decimal(key: &str) -> Option<Decimal> {
    env_string(key).and_then(|v| Decimal::from_str(&v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    fn store_in(dir: &Path) -> ConfigStore {
        ConfigStore::in_data_dir(dir)
    }

    // -----------------------------------------------------------------------
    // Store lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn test_first_run_creates_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let config = store.load_or_init().unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert!(store.path().exists());

        // Second call reads the file it just created.
        let again = store.load_or_init().unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let config = RuntimeConfig {
            scan_interval_seconds: 120,
            active_strategy_key: "gold".into(),
            ..RuntimeConfig::default()
        };

        assert_eq!(store.write(&config).unwrap(), WriteOutcome::Written);
        assert_eq!(store.read().unwrap(), config);
    }

    #[test]
    fn test_identical_rewrite_is_unchanged_and_leaves_file_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let config = store.load_or_init().unwrap();
        let marker_before = store.marker().unwrap();

        assert_eq!(store.write(&config).unwrap(), WriteOutcome::Unchanged);

        let marker_after = store.marker().unwrap();
        assert_eq!(marker_before, marker_after, "no-op write must not touch the file");
    }

    #[test]
    fn test_marker_changes_when_content_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let mut config = store.load_or_init().unwrap();
        let before = store.marker().unwrap();

        config.scan_interval_seconds = 300;
        store.write(&config).unwrap();

        let after = store.marker().unwrap();
        assert_ne!(before.sha256, after.sha256);
    }

    #[test]
    fn test_rewrite_backs_up_previous_version() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let mut config = store.load_or_init().unwrap();
        config.scan_interval_seconds = 90;
        store.write(&config).unwrap();

        let backup_dir = tmp.path().join(CONFIG_BACKUP_DIR);
        let backups: Vec<_> = std::fs::read_dir(&backup_dir)
            .unwrap()
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(backups.len(), 1);

        // The backup holds the pre-write version.
        let backed_up: RuntimeConfig =
            serde_json::from_slice(&std::fs::read(backups[0].path()).unwrap()).unwrap();
        assert_eq!(backed_up.scan_interval_seconds, RuntimeConfig::default().scan_interval_seconds);
    }

    #[test]
    fn test_invalid_config_never_reaches_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.load_or_init().unwrap();

        let config = RuntimeConfig {
            scan_interval_seconds: 2,
            ..RuntimeConfig::default()
        };
        assert!(store.write(&config).is_err());

        assert_eq!(store.read().unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_corrupt_file_is_a_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        std::fs::write(store.path(), b"{ not json").unwrap();
        assert!(store.read().is_err());
        assert!(store.load_or_init().is_err(), "existing corrupt file must not be overwritten");
    }

    // -----------------------------------------------------------------------
    // Patch semantics
    // -----------------------------------------------------------------------

    #[test]
    fn test_apply_patch_merges_risk_block() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.load_or_init().unwrap();

        let (config, outcome) = store
            .apply_patch(&json!({"risk": {"max_positions": 9}}))
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(config.risk.max_positions, 9);
        // Untouched fields survive the merge.
        let defaults = RuntimeConfig::default();
        assert_eq!(config.risk.daily_trade_limit, defaults.risk.daily_trade_limit);
        assert_eq!(config.active_strategy_key, defaults.active_strategy_key);
        assert_eq!(store.read().unwrap(), config);
    }

    #[test]
    fn test_apply_identical_patch_is_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.load_or_init().unwrap();

        let defaults = RuntimeConfig::default();
        let (_, outcome) = store
            .apply_patch(&json!({"scan_interval_seconds": defaults.scan_interval_seconds}))
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Unchanged);
    }

    #[test]
    fn test_apply_patch_rejects_secret_field() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.load_or_init().unwrap();

        let err = store
            .apply_patch(&json!({"risk": {"oanda_api_key": "s3cr3t-value"}}))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("oanda_api_key"), "should name the field: {msg}");
        assert!(!msg.contains("s3cr3t-value"), "must not echo the value: {msg}");

        assert_eq!(store.read().unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_apply_patch_rejects_unknown_field() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.load_or_init().unwrap();

        let err = store.apply_patch(&json!({"max_legs": 3})).unwrap_err();
        assert!(err.to_string().contains("max_legs"), "got: {err}");
        assert_eq!(store.read().unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_apply_patch_rejects_non_object() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.load_or_init().unwrap();

        let err = store.apply_patch(&json!("gold")).unwrap_err();
        assert!(err.to_string().contains("JSON object"), "got: {err}");
    }

    #[test]
    fn test_apply_patch_out_of_bounds_leaves_file_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.load_or_init().unwrap();

        let err = store
            .apply_patch(&json!({"scan_interval_seconds": 2}))
            .unwrap_err();
        assert!(err.to_string().contains("scan_interval_seconds"));
        assert_eq!(store.read().unwrap(), RuntimeConfig::default());
    }

    // -----------------------------------------------------------------------
    // Concurrent writers
    // -----------------------------------------------------------------------

    #[test]
    fn test_concurrent_writers_leave_one_complete_config() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.load_or_init().unwrap();

        let slow = RuntimeConfig {
            scan_interval_seconds: 60,
            ..RuntimeConfig::default()
        };
        let fast = RuntimeConfig {
            scan_interval_seconds: 90,
            ..RuntimeConfig::default()
        };

        std::thread::scope(|scope| {
            let store_a = &store;
            let store_b = &store;
            let a = scope.spawn(move || {
                for _ in 0..20 {
                    store_a.write(&slow).unwrap();
                }
            });
            let b = scope.spawn(move || {
                for _ in 0..20 {
                    store_b.write(&fast).unwrap();
                }
            });
            a.join().unwrap();
            b.join().unwrap();
        });

        // Whoever won, the file is a complete config, never a torn mix.
        let survivor = store.read().unwrap();
        assert!(
            survivor.scan_interval_seconds == 60 || survivor.scan_interval_seconds == 90,
            "unexpected survivor: {survivor:?}"
        );
    }

    // -----------------------------------------------------------------------
    // Env helpers
    // -----------------------------------------------------------------------

    #[test]
    #[serial]
    fn test_env_bool_parsing() {
        std::env::set_var("SWING_TEST_FLAG", "true");
        assert_eq!(env_bool("SWING_TEST_FLAG"), Some(true));
        std::env::set_var("SWING_TEST_FLAG", "1");
        assert_eq!(env_bool("SWING_TEST_FLAG"), Some(true));
        std::env::set_var("SWING_TEST_FLAG", "yes");
        assert_eq!(env_bool("SWING_TEST_FLAG"), Some(true));
        std::env::set_var("SWING_TEST_FLAG", "no");
        assert_eq!(env_bool("SWING_TEST_FLAG"), Some(false));
        std::env::set_var("SWING_TEST_FLAG", "");
        assert_eq!(env_bool("SWING_TEST_FLAG"), None);
        std::env::remove_var("SWING_TEST_FLAG");
        assert_eq!(env_bool("SWING_TEST_FLAG"), None);
    }

    #[test]
    #[serial]
    fn test_env_parse_invalid_is_none() {
        std::env::set_var("SWING_TEST_NUM", "not_a_number");
        assert_eq!(env_parse::<u64>("SWING_TEST_NUM"), None);
        std::env::set_var("SWING_TEST_NUM", "42");
        assert_eq!(env_parse::<u64>("SWING_TEST_NUM"), Some(42));
        std::env::remove_var("SWING_TEST_NUM");
    }
}
