//! Bounded exponential-backoff retry around a single heartbeat attempt.
//!
//! Transient errors are absorbed here so that only sustained
//! unavailability reaches the checker's failure budget.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use vitals_core::config::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY};

use crate::error::{HeartbeatError, ProbeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled before each later one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Sleep inserted after failed attempt `n` (1-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        let exp = (attempt - 1).min(30);
        self.base_delay.saturating_mul(1u32 << exp)
    }

    /// The full backoff schedule, one entry per retry.
    pub fn delays(&self) -> Vec<Duration> {
        (1..self.attempts()).map(|n| self.delay_after(n)).collect()
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number. On exhaustion the last
    /// error is returned inside [`ProbeError::Exhausted`].
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T, ProbeError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, HeartbeatError>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    return Err(ProbeError::Exhausted {
                        attempts,
                        source: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    debug!(attempt, ?delay, error = %e, "heartbeat attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(
            policy.delays(),
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
            ]
        );
    }

    #[test]
    fn zero_attempts_behaves_like_one() {
        let policy = RetryPolicy::new(0, Duration::from_millis(500));
        assert!(policy.delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success() {
        let policy = RetryPolicy::default();
        let start = Instant::now();
        let mut calls = 0;

        let result = policy
            .run(|attempt| {
                calls += 1;
                async move {
                    if attempt < 3 {
                        Err(HeartbeatError::Status(503))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
        // 500ms + 1s of backoff before the third attempt.
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_error_when_exhausted() {
        let policy = RetryPolicy::default();
        let start = Instant::now();

        let result: Result<(), _> = policy
            .run(|attempt| async move { Err(HeartbeatError::Status(500 + attempt as u16)) })
            .await;

        match result {
            Err(ProbeError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(source, HeartbeatError::Status(504)));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(start.elapsed(), Duration::from_millis(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn no_retry_policy_tries_once() {
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::no_retry()
            .run(|_| {
                calls += 1;
                async { Err(HeartbeatError::Status(500)) }
            })
            .await;

        assert!(matches!(result, Err(ProbeError::Exhausted { attempts: 1, .. })));
        assert_eq!(calls, 1);
    }
}
