use std::sync::Arc;

use tokio::sync::broadcast;

use swing_bot::{ConfigStore, SnapshotReader, StrategyRegistry};

use crate::config::ServiceConfig;

/// Shared handles for every request handler.
///
/// The store and reader point at the same files the scan loop owns; the
/// file system is the only channel between the two processes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub reader: Arc<SnapshotReader>,
    pub registry: Arc<StrategyRegistry>,
    pub log_sender: broadcast::Sender<String>,
    pub auth_token: Arc<Option<String>>,
    pub stale_grace_seconds: u64,
}

impl AppState {
    pub fn new(config: &ServiceConfig, log_sender: broadcast::Sender<String>) -> Self {
        Self {
            store: Arc::new(ConfigStore::in_data_dir(&config.data_dir)),
            reader: Arc::new(SnapshotReader::in_data_dir(&config.data_dir)),
            registry: Arc::new(StrategyRegistry::builtin()),
            log_sender,
            auth_token: Arc::new(config.auth_token.clone()),
            stale_grace_seconds: config.stale_grace_seconds,
        }
    }

    /// The configured bearer token, if any non-empty one is set.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }
}
