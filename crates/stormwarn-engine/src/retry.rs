//! Retry policy for the forecast fetch step.
//!
//! Retries transient failures (timeouts, provider/server errors,
//! connection problems). It does NOT retry credential failures:
//! `Unauthorized` and `CredentialsMissing` cannot succeed on a second
//! attempt and would only delay the fallback path.

use std::future::Future;
use std::time::Duration;

use stormwarn_weather::WeatherError;

/// Total attempts for one fetch step (the first attempt included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts (not additional retries)
    pub max_attempts: u32,
    /// Backoff unit; the delay before attempt n+1 is `base_delay * n`
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Delay after the given 1-based attempt index (linear backoff).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `operation` with the retry policy.
///
/// Any failure on the final attempt propagates; non-retryable errors
/// short-circuit immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, WeatherError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WeatherError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("Fetch succeeded on attempt {}", attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                let delay = config.delay_after_attempt(attempt);
                tracing::warn!(
                    "Retryable error on attempt {} of {}: {}; waiting {:?}",
                    attempt,
                    config.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if !e.is_retryable() {
                    tracing::debug!("Non-retryable error: {}", e);
                } else {
                    tracing::error!("All {} fetch attempts exhausted", config.max_attempts);
                }
                return Err(e);
            }
        }
    }
}
