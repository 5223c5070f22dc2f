//! Exponential backoff with jitter for retryable provider errors.

use crate::provider::ProviderError;
use std::time::Duration;

/// Backoff schedule: 5 attempts, 1s base delay, 30s cap, 2x multiplier,
/// ±25% jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts including the first, non-retried call.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Delay never exceeds this, regardless of attempt count.
    pub max_delay: Duration,
    /// Delay multiplier applied per attempt.
    pub multiplier: f64,
    /// Fractional jitter applied symmetrically around the computed delay.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl RetryConfig {
    /// Delay before the `attempt`-th retry (0-indexed: the delay before
    /// the *first* retry is `delay_for(0)`). `jitter_unit` must be in
    /// `[-1.0, 1.0]`; the caller supplies it so the schedule stays
    /// deterministic and testable without depending on a random source.
    pub fn delay_for(&self, attempt: u32, jitter_unit: f64) -> Duration {
        let unjittered = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = unjittered.min(self.max_delay.as_secs_f64());
        let jittered = capped * (1.0 + self.jitter * jitter_unit.clamp(-1.0, 1.0));
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Run `f` with retries per `config`, using `sleep` to await between
/// attempts and `jitter_source` to produce each attempt's jitter unit in
/// `[-1.0, 1.0]`.
///
/// Generic over the sleep function so tests can run instantly instead of
/// waiting on real timers.
pub async fn retry_with_backoff<F, Fut, S, SFut, J>(
    config: &RetryConfig,
    jitter_source: &mut J,
    mut sleep: S,
    mut f: F,
) -> Result<crate::types::ProviderResponse, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<crate::types::ProviderResponse, ProviderError>>,
    S: FnMut(Duration) -> SFut,
    SFut: std::future::Future<Output = ()>,
    J: FnMut() -> f64,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_retryable() && attempt + 1 < config.max_attempts => {
                let delay = config.delay_for(attempt, jitter_source());
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
