use std::future::Future;
use std::time::Duration;

/// Attempt budget and backoff for a single network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after every failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }
}

/// Callers only see the final outcome; intermediate failures are logged.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut delay = policy.base_delay;
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                tracing::error!(
                    operation = what,
                    attempts,
                    error = %format!("{err:#}"),
                    "operation failed after retries"
                );
                return Err(err.context(format!("{what} failed after {attempts} attempt(s)")));
            }
            Err(err) => {
                tracing::warn!(
                    operation = what,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %format!("{err:#}"),
                    "attempt failed; retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
        }
    }
}
