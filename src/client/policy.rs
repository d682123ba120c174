use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do after a failed provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { delay: Duration },
    Fallback,
}

/// Bounded backoff applied by the orchestrator before it falls back.
///
/// Only rate-limited failures are retried. `max_attempts` counts the first
/// call, so the default of 1 means no retry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay_ms: u32,
    pub max_delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            min_delay_ms: 250,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Capped exponential delay; `Retry-After` wins when present but is capped too.
    pub fn backoff_delay(&self, attempt: u32, retry_after_ms: Option<u32>) -> Duration {
        let base = if self.min_delay_ms == 0 {
            0
        } else {
            // exponential backoff: min_delay * 2^attempt
            let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
            self.min_delay_ms.saturating_mul(factor)
        };
        let chosen = retry_after_ms.unwrap_or(base).min(self.max_delay_ms);
        Duration::from_millis(chosen as u64)
    }

    /// Decide after a failure. `attempt` is 0-based (first failure => attempt=0).
    pub fn decide(&self, err: &ProviderError, attempt: u32) -> Decision {
        if err.is_rate_limited() && attempt + 1 < self.max_attempts {
            return Decision::Retry {
                delay: self.backoff_delay(attempt, err.retry_after_ms()),
            };
        }
        Decision::Fallback
    }
}
