//! Transport-level retry with exponential backoff.
//!
//! HTTP clients wrap each outbound call in [`RetryPolicy::execute`]. Whether a
//! failure is retried is decided by [`GatewayError::is_retryable`], so
//! configuration, validation and unsupported-operation errors are returned on
//! the first attempt.

use gateway_core::GatewayError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Jitter factor (0.0 - 1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

/// Retry policy attached to a transport client
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    name: &'static str,
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy
    #[must_use]
    pub fn new(name: &'static str, config: RetryConfig) -> Self {
        Self { name, config }
    }

    /// Default backoff with a custom retry count
    #[must_use]
    pub fn with_max_retries(name: &'static str, max_retries: u32) -> Self {
        Self::new(
            name,
            RetryConfig {
                max_retries,
                ..RetryConfig::default()
            },
        )
    }

    /// Policy that never retries
    #[must_use]
    pub fn none(name: &'static str) -> Self {
        Self::with_max_retries(name, 0)
    }

    /// Backoff before retry number `attempt` (0-indexed)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay.as_millis() as f64;
        let delay = base * self.config.multiplier.powi(attempt.min(31) as i32);
        let delay = delay.min(self.config.max_delay.as_millis() as f64);

        let jitter_range = delay * self.config.jitter;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((delay + jitter).max(0.0) as u64)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent.
    ///
    /// # Errors
    /// Returns the last error
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(policy = self.name, attempt, "Retry succeeded");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.config.max_retries {
                        return Err(error);
                    }

                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        policy = self.name,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
