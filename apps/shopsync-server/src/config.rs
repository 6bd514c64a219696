//! Server configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use shopsync_engine::{EngineConfig, WorkerConfig};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Runtime configuration for the shopsync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,

    /// Reconciliation engine tuning.
    pub engine: EngineConfig,

    /// Background worker tuning.
    pub worker: WorkerConfig,
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let engine_defaults = EngineConfig::default();
        let worker_defaults = WorkerConfig::default();

        let engine = EngineConfig {
            batch_size: parse_var("SHOPSYNC_BATCH_SIZE", engine_defaults.batch_size)?,
            max_attempts: parse_var("SHOPSYNC_MAX_ATTEMPTS", engine_defaults.max_attempts)?,
            retry_base_ms: parse_var("SHOPSYNC_RETRY_BASE_MS", engine_defaults.retry_base_ms)?,
            retry_cap_ms: parse_var("SHOPSYNC_RETRY_CAP_MS", engine_defaults.retry_cap_ms)?,
            lock_wait_ms: parse_var("SHOPSYNC_LOCK_WAIT_MS", engine_defaults.lock_wait_ms)?,
            attempt_timeout_secs: parse_var(
                "SHOPSYNC_ATTEMPT_TIMEOUT_SECS",
                engine_defaults.attempt_timeout_secs,
            )?,
        };
        engine.validate().map_err(|e| ConfigError::Invalid {
            var: "SHOPSYNC_*".to_string(),
            reason: e.to_string(),
        })?;

        let worker = WorkerConfig {
            concurrency: parse_var("SHOPSYNC_WORKER_CONCURRENCY", worker_defaults.concurrency)?,
            poll_interval_ms: parse_var(
                "SHOPSYNC_POLL_INTERVAL_MS",
                worker_defaults.poll_interval_ms,
            )?,
            lock_purge_interval_secs: parse_var(
                "SHOPSYNC_LOCK_PURGE_INTERVAL_SECS",
                worker_defaults.lock_purge_interval_secs,
            )?,
            batch_size: parse_var("SHOPSYNC_WORKER_BATCH_SIZE", worker_defaults.batch_size)?,
        };

        Ok(Self {
            listen_addr: parse_var(
                "SHOPSYNC_LISTEN_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 8080)),
            )?,
            engine,
            worker,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load() {
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert!(config.engine.batch_size > 0);
        assert!(config.worker.concurrency > 0);
    }
}
