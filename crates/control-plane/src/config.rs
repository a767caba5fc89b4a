use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use swing_bot::config::{env_parse, env_string};
use swing_bot::constants::{
    DEFAULT_CONTROL_LISTEN_ADDR, DEFAULT_DATA_DIR, DEFAULT_LOG_DIR, DEFAULT_STALE_GRACE_SECONDS,
    ENV_CONTROL_AUTH_TOKEN, ENV_CONTROL_LISTEN_ADDR, ENV_DATA_DIR, ENV_LOG_DIR,
    ENV_STATUS_STALE_GRACE_SECS,
};

/// Service configuration, resolved once at startup from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Bearer token for mutating endpoints. `None` means mutation is
    /// disabled outright, not open.
    pub auth_token: Option<String>,
    pub stale_grace_seconds: u64,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let listen_addr = env_string(ENV_CONTROL_LISTEN_ADDR)
            .unwrap_or_else(|| DEFAULT_CONTROL_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .with_context(|| format!("invalid listen address: {listen_addr}"))?;

        Ok(Self {
            listen_addr,
            data_dir: env_string(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            log_dir: env_string(ENV_LOG_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            auth_token: env_string(ENV_CONTROL_AUTH_TOKEN),
            stale_grace_seconds: env_parse::<u64>(ENV_STATUS_STALE_GRACE_SECS)
                .unwrap_or(DEFAULT_STALE_GRACE_SECONDS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_when_env_unset() {
        std::env::remove_var(ENV_CONTROL_LISTEN_ADDR);
        std::env::remove_var(ENV_CONTROL_AUTH_TOKEN);
        std::env::remove_var(ENV_DATA_DIR);
        std::env::remove_var(ENV_LOG_DIR);
        std::env::remove_var(ENV_STATUS_STALE_GRACE_SECS);

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.listen_addr.to_string(), DEFAULT_CONTROL_LISTEN_ADDR);
        assert_eq!(config.auth_token, None, "no token means locked, not open");
        assert_eq!(config.stale_grace_seconds, DEFAULT_STALE_GRACE_SECONDS);
    }

    #[test]
    #[serial]
    fn test_env_overrides_apply() {
        std::env::set_var(ENV_CONTROL_LISTEN_ADDR, "0.0.0.0:9000");
        std::env::set_var(ENV_CONTROL_AUTH_TOKEN, "sekrit");
        std::env::set_var(ENV_STATUS_STALE_GRACE_SECS, "45");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.auth_token.as_deref(), Some("sekrit"));
        assert_eq!(config.stale_grace_seconds, 45);

        std::env::remove_var(ENV_CONTROL_LISTEN_ADDR);
        std::env::remove_var(ENV_CONTROL_AUTH_TOKEN);
        std::env::remove_var(ENV_STATUS_STALE_GRACE_SECS);
    }

    #[test]
    #[serial]
    fn test_garbage_listen_addr_is_an_error() {
        std::env::set_var(ENV_CONTROL_LISTEN_ADDR, "not-an-address");
        let err = ServiceConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("invalid listen address"));
        std::env::remove_var(ENV_CONTROL_LISTEN_ADDR);
    }
}
