//! Bounded exponential backoff for per-unit retries.

use std::time::Duration;

use crate::config::EngineConfig;

/// Retry policy with exponential backoff and a delay cap.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base: Duration,
    cap: Duration,
}

impl RetryPolicy {
    /// Build a policy from engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base: Duration::from_millis(config.retry_base_ms),
            cap: Duration::from_millis(config.retry_cap_ms),
        }
    }

    /// Maximum attempts, first try included.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the given retry. `attempt` is 1-based: the delay
    /// before attempt 2 is the base, before attempt 3 it doubles, capped.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(2).min(16);
        let delay = self.base.saturating_mul(2u32.saturating_pow(exp));
        delay.min(self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::from_config(&EngineConfig {
            max_attempts: 5,
            retry_base_ms: 200,
            retry_cap_ms: 1_000,
            ..EngineConfig::default()
        });
        assert_eq!(policy.delay_before(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before(3), Duration::from_millis(400));
        assert_eq!(policy.delay_before(4), Duration::from_millis(800));
        // Capped.
        assert_eq!(policy.delay_before(5), Duration::from_millis(1_000));
    }
}
