//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Configuration for sync job execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Page size used when enumerating a full-sync target set.
    pub batch_size: usize,

    /// Maximum attempts per reconciliation unit (first try included).
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts.
    pub retry_base_ms: u64,

    /// Upper bound on a single backoff delay.
    pub retry_cap_ms: u64,

    /// Bounded wait for the per-resource advisory lock.
    pub lock_wait_ms: u64,

    /// Deadline for a single reconciliation attempt.
    pub attempt_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_attempts: 3,
            retry_base_ms: 200,
            retry_cap_ms: 5_000,
            lock_wait_ms: 2_000,
            attempt_timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.batch_size == 0 {
            return Err(EngineError::validation("batch_size must be positive"));
        }
        if self.max_attempts == 0 {
            return Err(EngineError::validation("max_attempts must be positive"));
        }
        if self.attempt_timeout_secs == 0 {
            return Err(EngineError::validation(
                "attempt_timeout_secs must be positive",
            ));
        }
        Ok(())
    }

    /// Bounded lock wait as a `Duration`.
    #[must_use]
    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    /// Per-attempt deadline as a `Duration`.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}
