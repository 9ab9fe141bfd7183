//! Bounded retry with linear backoff.
//!
//! Each attempt reports an explicit [`Attempt`]; [`RetryPolicy::run`] keeps
//! going while attempts are retryable and the budget lasts, sleeping
//! `base_delay × attempt` between them. When it gives up the caller receives a
//! [`RetryError`] carrying the last failure and how many attempts were made, and
//! decides what that means (the fetcher, for instance, fails the whole fetch).

use std::{future::Future, time::Duration};

use snafu::Snafu;
use tracing::warn;

use crate::providers::ProviderError;

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    Success(T),
    Retryable(ProviderError),
    Fatal(ProviderError),
}

impl<T> From<Result<T, ProviderError>> for Attempt<T> {
    fn from(result: Result<T, ProviderError>) -> Self {
        match result {
            Ok(value) => Attempt::Success(value),
            Err(err) if err.is_retryable() => Attempt::Retryable(err),
            Err(err) => Attempt::Fatal(err),
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Snafu)]
pub enum RetryError {
    #[snafu(display("gave up after {attempts} attempt(s): {source}"))]
    Exhausted { attempts: u32, source: ProviderError },

    #[snafu(display("non-retryable failure on attempt {attempt}: {source}"))]
    Fatal { attempt: u32, source: ProviderError },
}

impl RetryError {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Fatal { attempt, .. } => *attempt,
        }
    }

    /// The failure of the final attempt.
    pub fn last_error(&self) -> &ProviderError {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::Fatal { source, .. } => source,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Treated as at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Pause after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Runs `op` until it succeeds, fails fatally, or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number. `label` only feeds the logs.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Attempt::Success(value) => return Ok(value),
                Attempt::Fatal(source) => return Err(RetryError::Fatal { attempt, source }),
                Attempt::Retryable(source) if attempt >= max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source,
                    });
                }
                Attempt::Retryable(source) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %source,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
