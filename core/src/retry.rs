//! Bounded retry around a single transfer attempt.
//!
//! Only `SerializationConflict` is retried. Validation failures and
//! `StorageUnavailable` return on the first attempt.

use crate::{config::RetryConfig, error::LedgerResult};
use rand::Rng;
use std::thread;
use std::time::Duration;

/// Jittered exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_pct: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64, max_delay_ms: u64, jitter_pct: f64) -> Self {
        let clamped_base = base_delay_ms.max(1);
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: clamped_base,
            max_delay_ms: max_delay_ms.max(clamped_base),
            jitter_pct: jitter_pct.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.base_delay_ms,
            config.max_delay_ms,
            config.jitter_pct,
        )
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, 1, 1, 0.0)
    }

    fn next_delay(&self, attempt: usize) -> Duration {
        let exp = 2_u64.saturating_pow(attempt as u32);
        let delay = self.base_delay_ms.saturating_mul(exp).min(self.max_delay_ms);
        if self.jitter_pct == 0.0 {
            return Duration::from_millis(delay);
        }
        let spread = (delay as f64 * self.jitter_pct) as i64;
        let delta = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_millis(delay.saturating_add_signed(delta))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is reached. `op` receives the 0-based attempt number.
    /// After the last attempt the final conflict is returned as-is.
    pub fn run<T, F>(&self, mut op: F) -> LedgerResult<T>
    where
        F: FnMut(usize) -> LedgerResult<T>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        log::warn!("retry: giving up after {attempt} attempts: {err}");
                        return Err(err);
                    }
                    let delay = self.next_delay(attempt - 1);
                    log::warn!(
                        "retry: attempt {attempt}/{} conflicted, backing off {}ms",
                        self.max_attempts,
                        delay.as_millis()
                    );
                    thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
