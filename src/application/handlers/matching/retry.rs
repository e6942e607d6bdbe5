//! Jittered exponential backoff for conflicting transactions.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::config::MatchingConfig;

/// How a retried operation ultimately failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error that must not be retried.
    Aborted { attempt: u32, source: E },
}

/// Backoff policy shared by matching runs and release transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_pct: f64,
}

impl RetryPolicy {
    /// Out-of-range values are clamped: at least one attempt, a base delay
    /// of at least 1ms, a cap no lower than the base, jitter within 0..=1.
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64, jitter_pct: f64) -> Self {
        let base_delay_ms = base_delay_ms.max(1);
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
            jitter_pct: jitter_pct.clamp(0.0, 1.0),
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, 1, 1, 0.0)
    }

    /// Delay before retry number `retry` (0 for the first retry).
    pub fn next_delay(&self, retry: u32) -> Duration {
        let exp = 2_u64.saturating_pow(retry);
        let delay = self.base_delay_ms.saturating_mul(exp).min(self.max_delay_ms);
        if self.jitter_pct == 0.0 {
            return Duration::from_millis(delay);
        }
        let spread = (delay as f64 * self.jitter_pct) as i64;
        let delta = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_millis(delay.saturating_add_signed(delta))
    }

    /// Run `op` until it succeeds, fails with an error `is_retryable`
    /// rejects, or the attempt budget runs out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn retry_async_if<F, Fut, T, E, P>(
        &self,
        mut op: F,
        is_retryable: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !is_retryable(&err) => {
                    return Err(RetryError::Aborted {
                        attempt,
                        source: err,
                    })
                }
                Err(err) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    })
                }
                Err(_) => {
                    let delay = self.next_delay(attempt - 1);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after conflict");
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, 25, 1_000, 0.2)
    }
}

impl From<&MatchingConfig> for RetryPolicy {
    fn from(config: &MatchingConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.base_delay_ms,
            config.max_delay_ms,
            config.jitter_pct,
        )
    }
}
