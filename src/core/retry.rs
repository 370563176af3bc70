//! Retry logic with exponential backoff
//!
//! Used for the short-lived token exchange: each Develocity host gets up to
//! three attempts before the caller falls back to the provided access key.
//! Gate registry writes do not go through this path:
//! a stale-revision conflict needs a reload, not a blind replay.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Options for retry behavior
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry manager for transient HTTP failures
pub struct RetryManager {
    options: RetryOptions,
}

impl RetryManager {
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    /// Execute the given async operation, retrying transient failures
    ///
    /// Non-transient errors are returned immediately; transient ones are
    /// retried up to `max_attempts` with exponential backoff.
    pub async fn retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut delay = self.options.initial_delay;
        let mut last_error: Option<E> = None;

        for attempt in 1..=self.options.max_attempts {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !Self::is_transient(&error) || attempt >= self.options.max_attempts {
                        return Err(error);
                    }

                    last_error = Some(error);

                    sleep(delay).await;
                    delay = Duration::from_secs_f64(
                        delay.as_secs_f64() * self.options.backoff_multiplier,
                    )
                    .min(self.options.max_delay);
                }
            }
        }

        // Unreachable: the loop always returns on the last attempt
        Err(last_error.unwrap())
    }

    /// Check if an error is worth retrying
    ///
    /// Server-side failures (5xx) and transport errors are transient; client
    /// errors (bad key, bad request) are not and fail straight through to the
    /// caller's fallback.
    fn is_transient<E: std::fmt::Display>(error: &E) -> bool {
        let message = error.to_string().to_lowercase();

        const TRANSIENT_PATTERNS: &[&str] = &[
            "500",
            "502",
            "503",
            "504",
            "timeout",
            "timed out",
            "connection refused",
            "connection reset",
            "dns error",
        ];

        TRANSIENT_PATTERNS
            .iter()
            .any(|pattern| message.contains(pattern))
    }
}
