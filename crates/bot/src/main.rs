use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use swing_bot::broker::paper::PaperBroker;
use swing_bot::config::env_bool;
use swing_bot::constants::{
    DEFAULT_DATA_DIR, DEFAULT_LOG_DIR, ENV_CONTROL_PLANE_AUTOSTART, ENV_DATA_DIR, ENV_LOG_DIR,
};
use swing_bot::logging;
use swing_bot::snapshot::SnapshotWriter;
use swing_bot::{ConfigStore, Runner};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    let data_dir = env_dir(ENV_DATA_DIR, DEFAULT_DATA_DIR);
    let log_dir = env_dir(ENV_LOG_DIR, DEFAULT_LOG_DIR);
    std::fs::create_dir_all(&data_dir).context("failed to create data directory")?;

    // Initialize tracing; hold the guard for the process lifetime.
    let _guard = logging::init_tracing(&log_dir)?;

    info!(
        data_dir = %data_dir.display(),
        log_dir = %log_dir.display(),
        "swing bot starting"
    );

    // -----------------------------------------------------------------------
    // Component construction
    // -----------------------------------------------------------------------

    // 1. Config store (creates a default runtime config on first run)
    let store = ConfigStore::in_data_dir(&data_dir);

    // 2. Status snapshot writer
    let writer = SnapshotWriter::in_data_dir(&data_dir);

    // 3. Broker (paper broker with a seeded random walk)
    let broker = PaperBroker::from_env();

    // 4. Scan loop runner
    let runner = Runner::new(store, writer, Box::new(broker))
        .context("failed to initialize scan loop")?;

    info!(
        strategy = %runner.config().active_strategy_key,
        interval_s = runner.config().scan_interval_seconds,
        "configuration loaded"
    );

    // -----------------------------------------------------------------------
    // Control plane child process (optional)
    // -----------------------------------------------------------------------

    let control_plane = spawn_control_plane_if_enabled(&data_dir, &log_dir)?;

    // -----------------------------------------------------------------------
    // Launch and wait for shutdown
    // -----------------------------------------------------------------------

    let shutdown = CancellationToken::new();
    let scan_handle = tokio::spawn(runner.run(shutdown.clone()));

    info!("scan loop running, press Ctrl+C to shutdown");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    info!("shutdown signal received, stopping gracefully");
    shutdown.cancel();

    if let Some(mut child) = control_plane {
        info!("terminating control plane process");
        if let Err(e) = child.kill() {
            warn!(error = %e, "failed to kill control plane process");
        }
        // Wait for it to exit to avoid a zombie process.
        let _ = child.wait();
    }

    if let Err(e) = scan_handle.await {
        error!(error = %e, "scan loop task panicked");
    }

    info!("shutdown complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Initialization helpers
// ---------------------------------------------------------------------------

fn env_dir(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Spawn the control plane binary as a child process when
/// `CONTROL_PLANE_AUTOSTART` is set.
///
/// The child gets the same data and log directories as this process so both
/// sides agree on where the config and snapshot files live.
fn spawn_control_plane_if_enabled(
    data_dir: &std::path::Path,
    log_dir: &std::path::Path,
) -> Result<Option<Child>> {
    if !env_bool(ENV_CONTROL_PLANE_AUTOSTART).unwrap_or(false) {
        info!("control plane autostart disabled, not spawning");
        return Ok(None);
    }

    let binary = find_control_plane_binary();
    info!(path = %binary.display(), "spawning control plane process");

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let child = Command::new(&binary)
        .env("RUST_LOG", rust_log)
        .env(ENV_DATA_DIR, data_dir)
        .env(ENV_LOG_DIR, log_dir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .context("failed to spawn control-plane process")?;

    info!(pid = child.id(), "control plane started");
    Ok(Some(child))
}

/// Find the control-plane binary path.
///
/// Searches in order:
/// 1. Same directory as current executable
/// 2. ./target/release/control-plane
/// 3. Current directory
/// 4. PATH
fn find_control_plane_binary() -> PathBuf {
    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(exe_dir) = current_exe.parent() {
            let candidate = exe_dir.join("control-plane");
            if candidate.exists() {
                return candidate;
            }
        }
    }

    let dev_path = PathBuf::from("target/release/control-plane");
    if dev_path.exists() {
        return dev_path;
    }

    let cwd_path = PathBuf::from("control-plane");
    if cwd_path.exists() {
        return cwd_path;
    }

    // Fallback: assume it's in PATH.
    PathBuf::from("control-plane")
}
