//! Tail-and-broadcast relay from the rolling log files to live subscribers.
//!
//! A `TailState` follows the newest `bot.log.*` file in the log directory,
//! surviving daily rollover and in-place truncation. `LogRelay` pumps the
//! tail on a fixed poll interval and fans complete lines out over a bounded
//! broadcast channel. Every line passes through the redaction mask before
//! it reaches any subscriber; a slow subscriber loses the oldest lines, it
//! never stalls the scan loop.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::{LOG_FILE_PREFIX, RELAY_CHANNEL_CAPACITY, RELAY_POLL_INTERVAL_MS};
use crate::redaction;

// ---------------------------------------------------------------------------
// TailState
// ---------------------------------------------------------------------------

/// File-following state: which log file we are on, how far into it we have
/// read, and any trailing fragment that has not yet seen its newline.
pub struct TailState {
    log_dir: PathBuf,
    file_prefix: String,
    current: Option<PathBuf>,
    offset: u64,
    partial: Vec<u8>,
}

impl TailState {
    pub fn new(log_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            file_prefix: file_prefix.into(),
            current: None,
            offset: 0,
            partial: Vec::new(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Newest matching log file by filename. The daily roller suffixes the
    /// date as `bot.log.2026-08-23`, so lexicographic order is chronological.
    fn newest_log_file(&self) -> std::io::Result<Option<PathBuf>> {
        let entries = match std::fs::read_dir(&self.log_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut newest: Option<(String, PathBuf)> = None;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&self.file_prefix) {
                continue;
            }
            if newest.as_ref().map_or(true, |(best, _)| name > *best) {
                newest = Some((name, entry.path()));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }

    /// Read everything appended since the last poll and return the complete
    /// lines. Rollover to a newer file and in-place truncation both restart
    /// the tail from offset zero.
    pub fn poll(&mut self) -> std::io::Result<Vec<String>> {
        let Some(newest) = self.newest_log_file()? else {
            return Ok(Vec::new());
        };

        if self.current.as_deref() != Some(newest.as_path()) {
            debug!(file = %newest.display(), "relay following new log file");
            self.current = Some(newest.clone());
            self.offset = 0;
            self.partial.clear();
        }

        let mut file = match std::fs::File::open(&newest) {
            Ok(file) => file,
            // Rotated away between listing and open; pick it up next poll.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let len = file.metadata()?.len();
        if len < self.offset {
            debug!(file = %newest.display(), "log file truncated, restarting tail");
            self.offset = 0;
            self.partial.clear();
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = Vec::new();
        file.read_to_end(&mut chunk)?;
        if chunk.is_empty() {
            return Ok(Vec::new());
        }
        self.offset += chunk.len() as u64;
        self.partial.extend_from_slice(&chunk);

        // Split out complete lines; an unterminated tail fragment stays
        // buffered until its newline arrives.
        let mut lines = Vec::new();
        let mut start = 0usize;
        for i in 0..self.partial.len() {
            if self.partial[i] != b'\n' {
                continue;
            }
            let mut end = i;
            if end > start && self.partial[end - 1] == b'\r' {
                end -= 1;
            }
            if end > start {
                lines.push(String::from_utf8_lossy(&self.partial[start..end]).into_owned());
            }
            start = i + 1;
        }
        self.partial.drain(..start);

        Ok(lines)
    }
}

// ---------------------------------------------------------------------------
// LogRelay
// ---------------------------------------------------------------------------

/// Poll-and-publish relay over a bounded broadcast channel.
pub struct LogRelay {
    tail: TailState,
    sender: broadcast::Sender<String>,
}

impl LogRelay {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let (sender, _) = broadcast::channel(RELAY_CHANNEL_CAPACITY);
        Self {
            tail: TailState::new(log_dir, LOG_FILE_PREFIX),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Handle for creating subscriptions after the relay task owns `self`.
    pub fn sender(&self) -> broadcast::Sender<String> {
        self.sender.clone()
    }

    /// One poll-and-publish cycle. Returns how many lines were published.
    pub fn pump(&mut self) -> std::io::Result<usize> {
        let lines = self.tail.poll()?;
        let count = lines.len();
        for line in lines {
            // send only fails with zero subscribers, which is fine.
            let _ = self.sender.send(redaction::redact_line(&line));
        }
        Ok(count)
    }

    /// Main polling loop. Runs until the CancellationToken is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(dir = %self.tail.log_dir().display(), "log relay started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("log relay shutting down");
                    break;
                }
                () = tokio::time::sleep(Duration::from_millis(RELAY_POLL_INTERVAL_MS)) => {
                    if let Err(e) = self.pump() {
                        warn!(error = %e, "log relay poll failed");
                    }
                }
            }
        }
    }
}
