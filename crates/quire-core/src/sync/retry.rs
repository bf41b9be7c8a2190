//! Bounded exponential backoff for transient store failures

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub const fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            base_delay,
            max_delay,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after failed attempt `attempt` (1-based): base, 2x base, 4x base, ... capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Run `attempt` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// Only transient errors (`Error::is_transient`) are retried; the last
    /// error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut tries = 1;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && tries < self.max_attempts => {
                    let delay = self.delay_for(tries);
                    tracing::warn!(
                        operation,
                        attempt = tries,
                        ?delay,
                        %error,
                        "Transient store failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    tries += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
