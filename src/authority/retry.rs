use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{info, warn};

use super::transport::TransportError;

/// Largest fraction of a backoff added as jitter.
const MAX_JITTER: f64 = 0.25;

/// Bounded retry with exponential backoff for authority calls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single backoff.
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    /// Add up to 25% jitter to each backoff.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Short backoffs, useful against local or simulated authorities.
    pub fn quick(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 10,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    /// Backoff before retry number `attempt + 1`.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let backoff = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let backoff_ms = backoff.min(self.max_backoff_ms as f64).max(0.0) as u64;

        let mut duration = Duration::from_millis(backoff_ms);
        if self.jitter {
            let jitter = backoff_ms as f64 * rand::thread_rng().gen_range(0.0..=MAX_JITTER);
            duration += Duration::from_millis(jitter as u64);
        }
        duration
    }

    /// Upper bound on the wall time of a call made under this policy, when
    /// each attempt is cut off after `per_attempt`.
    pub fn max_elapsed(&self, per_attempt: Duration) -> Duration {
        let backoffs: Duration = (0..self.max_retries)
            .map(|attempt| {
                let capped = self.initial_backoff_ms as f64
                    * self.backoff_multiplier.powi(attempt as i32);
                let capped = capped.min(self.max_backoff_ms as f64).max(0.0);
                Duration::from_millis((capped * (1.0 + MAX_JITTER)).ceil() as u64)
            })
            .sum();
        per_attempt * (self.max_retries + 1) + backoffs
    }
}

/// The last error of a call that did not succeed, with the number of attempts made.
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub error: TransportError,
}

/// Run `f` until it succeeds, fails permanently, or the retry budget is spent.
///
/// Only errors for which [`TransportError::is_transient`] holds are retried.
/// `f` receives the 1-based attempt number.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt = 0;

    loop {
        match f(attempt + 1).await {
            Ok(result) => {
                if attempt > 0 {
                    info!(operation, attempt = attempt + 1, "authority call succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) => {
                if !error.is_transient() {
                    warn!(operation, %error, "authority call failed with permanent error, not retrying");
                    return Err(RetryExhausted {
                        attempts: attempt + 1,
                        error,
                    });
                }

                if attempt >= policy.max_retries {
                    warn!(operation, attempt = attempt + 1, %error, "authority call failed after max retries");
                    return Err(RetryExhausted {
                        attempts: attempt + 1,
                        error,
                    });
                }

                let backoff = policy.backoff_duration(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    %error,
                    backoff_ms = backoff.as_millis() as u64,
                    "authority call failed, retrying after backoff"
                );
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
