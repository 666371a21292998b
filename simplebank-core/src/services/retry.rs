//! Caller-side retry for transient store failures
//!
//! Concurrent transactions that touch the same account row conflict instead
//! of waiting on each other; the loser gets a transient error and the whole
//! operation has to be run again from the start.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::result::Result;

/// Backoff settings for [`with_retry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt (doubles each retry)
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 10,
            max_delay_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Run once, never retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based), with up to 50% jitter
    fn delay_for<R: Rng>(&self, retry: u32, rng: &mut R) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let base = self
            .initial_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        let jitter = if base > 1 {
            rng.gen_range(0..=base / 2)
        } else {
            0
        };
        Duration::from_millis(base.saturating_sub(jitter))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. The last error is returned unchanged.
pub fn with_retry<T, F>(policy: &RetryPolicy, op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    with_retry_using(policy, &mut StdRng::from_entropy(), op)
}

/// [`with_retry`] drawing backoff jitter from `rng`
pub fn with_retry_using<T, F, R>(policy: &RetryPolicy, rng: &mut R, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
    R: Rng,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt, rng);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient store error, retrying"
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
