// SPDX-License-Identifier: Apache-2.0

//! Fixed-cap exponential backoff for vSphere adapter retries.

use std::time::Duration;

/// A bounded exponential backoff schedule: `base * 2^attempt`, capped at `max_attempts`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max_attempts: u32,
}

impl Backoff {
    /// Builds a new backoff schedule.
    pub const fn new(base: Duration, max_attempts: u32) -> Self {
        Self { base, max_attempts }
    }

    /// The default adapter retry policy: 3 attempts, starting at 200ms.
    pub const fn default_adapter_policy() -> Self {
        Self::new(Duration::from_millis(200), 3)
    }

    /// Maximum number of attempts before giving up.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before attempt number `attempt` (0-indexed, 0 = first retry).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
    }

    /// Runs `op` up to `max_attempts` times, sleeping `delay_for` between attempts, returning
    /// the first success or the last error.
    pub async fn retry<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    tokio::time::sleep(self.delay_for(attempt - 1)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_grows_exponentially() {
        let backoff = Backoff::new(Duration::from_millis(100), 3);
        assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn retry_stops_after_max_attempts() {
        let backoff = Backoff::new(Duration::from_millis(1), 3);
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = backoff
            .retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom") }
            })
            .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_returns_first_success() {
        let backoff = Backoff::new(Duration::from_millis(1), 3);
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = backoff
            .retry(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 1 {
                        Err("not yet")
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(42));
    }
}
