use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// How long to wait before the next write attempt
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Wait `RetryConfig::delay` every time
    #[default]
    Fixed,
    /// Double `base_ms` per attempt, add up to half of that at random, never exceed `max_ms`
    ExponentialWithJitter { base_ms: u64, max_ms: u64 },
}

impl BackoffStrategy {
    fn wait(&self, fixed: Duration, attempt: u32) -> Duration {
        match *self {
            BackoffStrategy::Fixed => fixed,
            BackoffStrategy::ExponentialWithJitter { base_ms, max_ms } => {
                let doubled = 2_u64
                    .checked_pow(attempt)
                    .and_then(|factor| base_ms.checked_mul(factor))
                    .unwrap_or(u64::MAX);
                let spread = rand::thread_rng().gen_range(0..=doubled / 2);
                Duration::from_millis(doubled.saturating_add(spread).min(max_ms))
            }
        }
    }
}

/// Write retry policy. `max_attempts` counts the first try and is never below one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(500))
    }
}

impl RetryConfig {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(max_attempts: u32, base_ms: u64, max_ms: u64) -> Self {
        Self {
            max_attempts,
            delay: Duration::from_millis(base_ms),
            backoff: BackoffStrategy::ExponentialWithJitter { base_ms, max_ms },
        }
    }

    /// Pause after the failed attempt with zero-based index `attempt`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.wait(self.delay, attempt)
    }
}

/// Errors that say whether the same request could succeed later
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

/// Run `operation` until it succeeds, fails permanently, or the attempts run out.
/// The last error is returned unchanged.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable,
{
    let limit = config.max_attempts.max(1);
    let mut failed = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        failed += 1;
        if failed >= limit || !err.is_retryable() {
            return Err(err);
        }

        let pause = config.delay_for_attempt(failed - 1);
        tracing::debug!(
            failed,
            limit,
            pause_ms = pause.as_millis() as u64,
            "write failed, backing off"
        );
        tokio::time::sleep(pause).await;
    }
}
