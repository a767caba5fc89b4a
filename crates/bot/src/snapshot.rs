//! Atomic status hand-off between the scan loop and the control plane.
//!
//! The writer side normalizes the fail-closed invariant, sanitizes every
//! string through the redaction rules, and replaces the file with a
//! temp-and-rename so readers never observe a torn snapshot. The reader
//! side derives staleness from the snapshot's own reported interval.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::constants::STATUS_FILE_NAME;
use crate::errors::BotError;
use crate::redaction;
use crate::types::StatusSnapshot;

pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_data_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATUS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Normalize, sanitize, and atomically replace the snapshot file.
    pub fn write(&self, snapshot: StatusSnapshot) -> Result<(), BotError> {
        let normalized = snapshot.normalized();

        let mut doc = serde_json::to_value(&normalized)?;
        redaction::redact_value_strings(&mut doc);

        let mut rendered = serde_json::to_vec_pretty(&doc)?;
        rendered.push(b'\n');

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        // No fsync: the snapshot is rewritten every iteration, so a crash
        // costs at most one iteration of status.
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&rendered)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), iteration = normalized.iteration, "status snapshot written");
        Ok(())
    }
}

pub struct SnapshotReader {
    path: PathBuf,
}

impl SnapshotReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_data_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATUS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest snapshot, or `SnapshotUnavailable` when none has been written.
    pub fn read(&self) -> Result<StatusSnapshot, BotError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BotError::SnapshotUnavailable {
                    reason: "no status snapshot has been written yet".into(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Snapshot plus whether it is older than its own freshness threshold.
    pub fn read_with_staleness(&self, grace_seconds: u64) -> Result<(StatusSnapshot, bool), BotError> {
        let snapshot = self.read()?;
        let stale = snapshot.is_stale(now_unix(), grace_seconds);
        Ok((snapshot, stale))
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::types::{AccountView, ExecutionRoute, TradingMode};

    fn sample_snapshot() -> StatusSnapshot {
        StatusSnapshot {
            mode: TradingMode::Paper,
            execution_enabled: false,
            execution_route: ExecutionRoute::Paper,
            accounts_loaded: 1,
            accounts_execution_capable: 1,
            active_strategy_key: "momentum".into(),
            scan_interval_seconds: 60,
            iteration: 12,
            last_scan_timestamp: now_unix(),
            last_scan_duration_ms: 35,
            last_signals_generated: 1,
            last_executed_count: 1,
            last_gate_denied: 0,
            pending_signals: vec![],
            pending_trades: vec![],
            accounts: vec![AccountView {
                id: "paper-001".into(),
                alias: "sim-1".into(),
                currency: "USD".into(),
                balance: dec!(10_000),
                margin_available: dec!(10_000),
                execution_capable: true,
                open_position_count: 0,
            }],
            open_positions: vec![],
        }
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::in_data_dir(tmp.path());
        let reader = SnapshotReader::in_data_dir(tmp.path());

        writer.write(sample_snapshot()).unwrap();

        let read_back = reader.read().unwrap();
        assert_eq!(read_back.active_strategy_key, "momentum");
        assert_eq!(read_back.iteration, 12);
        assert_eq!(read_back.accounts.len(), 1);
    }

    #[test]
    fn test_write_enforces_fail_closed_invariant() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::in_data_dir(tmp.path());
        let reader = SnapshotReader::in_data_dir(tmp.path());

        // Inconsistent claim: enabled with zero capable accounts.
        let mut snapshot = sample_snapshot();
        snapshot.execution_enabled = true;
        snapshot.execution_route = ExecutionRoute::Live;
        snapshot.accounts_execution_capable = 0;
        writer.write(snapshot).unwrap();

        let read_back = reader.read().unwrap();
        assert!(!read_back.execution_enabled);
        assert_eq!(read_back.execution_route, ExecutionRoute::SignalsOnly);
    }

    #[test]
    fn test_secret_bearing_strings_are_masked_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::in_data_dir(tmp.path());
        let reader = SnapshotReader::in_data_dir(tmp.path());

        let mut snapshot = sample_snapshot();
        snapshot.accounts[0].alias = "demo token=tk_4f9a2b7c1d demo".into();
        writer.write(snapshot).unwrap();

        let raw = std::fs::read_to_string(writer.path()).unwrap();
        assert!(!raw.contains("tk_4f9a2b7c1d"), "raw secret must not reach disk");

        let read_back = reader.read().unwrap();
        assert!(read_back.accounts[0].alias.contains("[REDACTED]"));
    }

    #[test]
    fn test_clean_strings_survive_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::in_data_dir(tmp.path());
        let reader = SnapshotReader::in_data_dir(tmp.path());

        writer.write(sample_snapshot()).unwrap();

        let read_back = reader.read().unwrap();
        assert_eq!(read_back.active_strategy_key, "momentum");
        assert_eq!(read_back.accounts[0].alias, "sim-1");
    }

    #[test]
    fn test_missing_snapshot_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let reader = SnapshotReader::in_data_dir(tmp.path());

        let err = reader.read().unwrap_err();
        assert!(err.to_string().contains("status snapshot"), "got: {err}");
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let reader = SnapshotReader::in_data_dir(tmp.path());
        std::fs::write(reader.path(), b"{ half written").unwrap();

        assert!(reader.read().is_err());
    }

    #[test]
    fn test_staleness_follows_the_snapshots_own_interval() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::in_data_dir(tmp.path());
        let reader = SnapshotReader::in_data_dir(tmp.path());

        // Fresh: written just now.
        writer.write(sample_snapshot()).unwrap();
        let (_, stale) = reader.read_with_staleness(10).unwrap();
        assert!(!stale);

        // Old: beyond 2 * interval + grace.
        let mut snapshot = sample_snapshot();
        snapshot.last_scan_timestamp = now_unix() - 200;
        writer.write(snapshot).unwrap();
        let (_, stale) = reader.read_with_staleness(10).unwrap();
        assert!(stale, "snapshot 200s old with a 60s interval must be stale");
    }
}
