//! Retry utilities for upstream fetches with exponential backoff.
//!
//! Retries the transient failure class:
//! - Timeouts
//! - Connection failures
//! - Any non-2xx HTTP status
//!
//! It does NOT retry:
//! - Malformed requests (bad endpoint, unbuildable request)
//! - Response bodies that cannot be decoded

use std::future::Future;
use std::time::Duration;

use hydromet_core::{NetworkError, RetrySettings};
use thiserror::Error;

/// Default retry configuration
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry (doubles each retry)
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            settings.initial_delay_ms,
            settings.max_delay_ms,
        )
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Delay to wait before the given 0-based attempt.
    ///
    /// Attempt 0 starts immediately; attempt `i >= 1` waits
    /// `initial_delay * 2^(i-1)`, capped at `max_delay`.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u64.saturating_pow(attempt - 1);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }

    /// Attempts actually made; a zero setting still performs one attempt.
    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Should retry the request
    Retry,
    /// Should not retry - permanent failure
    NoRetry,
}

/// Classify a network error for the retry loop
pub fn retry_decision(error: &NetworkError) -> RetryDecision {
    if error.is_transient() {
        RetryDecision::Retry
    } else {
        RetryDecision::NoRetry
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, Error)]
pub enum RetryError {
    /// Every attempt failed with a transient error
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: NetworkError },

    /// A non-transient error stopped the loop early
    #[error("not retried: {0}")]
    Permanent(NetworkError),
}

impl RetryError {
    /// The error observed on the last attempt
    pub fn last_error(&self) -> &NetworkError {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Permanent(e) => e,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
///
/// The closure receives the 0-based attempt number. A warning is emitted
/// before every retry; no delay follows the final attempt.
///
/// # Example
/// ```ignore
/// let body = with_retry(&RetryConfig::default(), |_| async {
///     client.get(url).send().await.map_err(|e| e.into_network_error())
/// }).await?;
/// ```
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, NetworkError>>,
{
    let attempts = config.attempts();
    let mut last_error = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = config.delay_before_attempt(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                error = ?last_error,
                "Retrying upstream request"
            );
            tokio::time::sleep(delay).await;
        }

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("Request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                if retry_decision(&e) == RetryDecision::NoRetry {
                    tracing::debug!("Non-retryable error: {}", e);
                    return Err(RetryError::Permanent(e));
                }
                tracing::debug!(
                    "Retryable error on attempt {} of {}: {}",
                    attempt + 1,
                    attempts,
                    e
                );
                last_error = Some(e);
            }
        }
    }

    tracing::warn!(attempts, "All retry attempts exhausted");
    Err(RetryError::Exhausted {
        attempts,
        last: last_error.unwrap_or(NetworkError::ConnectionFailed(
            "no attempt was made".to_string(),
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Paused-clock sleeps land on the timer wheel's millisecond ticks.
    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual <= expected + Duration::from_millis(5),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(500));
        assert_eq!(config.max_delay, Duration::from_millis(5000));
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::default();

        assert_eq!(config.delay_before_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_before_attempt(1), Duration::from_millis(500));
        assert_eq!(config.delay_before_attempt(2), Duration::from_millis(1000));
        assert_eq!(config.delay_before_attempt(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::new(10, 100, 1000);

        // 100ms * 2^4 = 1600 > 1000
        assert_eq!(config.delay_before_attempt(5), Duration::from_millis(1000));
        assert_eq!(config.delay_before_attempt(40), Duration::from_millis(1000));
    }

    #[test]
    fn test_from_settings() {
        let settings = RetrySettings {
            max_attempts: 4,
            initial_delay_ms: 50,
            max_delay_ms: 400,
        };
        let config = RetryConfig::from(&settings);
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.initial_delay, Duration::from_millis(50));
        assert_eq!(config.max_delay, Duration::from_millis(400));
    }

    #[test]
    fn test_retry_decisions() {
        assert_eq!(retry_decision(&NetworkError::Timeout), RetryDecision::Retry);
        assert_eq!(
            retry_decision(&NetworkError::ConnectionFailed("refused".into())),
            RetryDecision::Retry
        );
        assert_eq!(
            retry_decision(&NetworkError::ServerError {
                status: 400,
                message: "bad request".into()
            }),
            RetryDecision::Retry
        );
        assert_eq!(
            retry_decision(&NetworkError::InvalidRequest("relative URL".into())),
            RetryDecision::NoRetry
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_uses_all_attempts_with_backoff() {
        let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let start = tokio::time::Instant::now();

        let recorded = calls.clone();
        let result: Result<(), RetryError> = with_retry(&RetryConfig::default(), |attempt| {
            recorded.lock().push((attempt, start.elapsed()));
            async { Err(NetworkError::Timeout) }
        })
        .await;

        let calls = calls.lock().clone();
        assert_eq!(calls.len(), 3);
        let attempts: Vec<u32> = calls.iter().map(|(a, _)| *a).collect();
        assert_eq!(attempts, vec![0, 1, 2]);
        assert_eq!(calls[0].1, Duration::ZERO);
        assert_near(calls[1].1 - calls[0].1, Duration::from_millis(500));
        assert_near(calls[2].1 - calls[1].1, Duration::from_millis(1000));

        // No sleep after the final attempt
        assert_eq!(start.elapsed(), calls[2].1);

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(last, NetworkError::Timeout));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let seen = counter.clone();

        let result: Result<(), RetryError> = with_retry(&RetryConfig::default(), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            async { Err(NetworkError::InvalidRequest("bad endpoint".into())) }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Permanent(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failure() {
        let result = with_retry(&RetryConfig::default(), |attempt| async move {
            if attempt == 0 {
                Err(NetworkError::ServerError {
                    status: 503,
                    message: "busy".into(),
                })
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let seen = counter.clone();
        let config = RetryConfig::new(0, 10, 10);

        let result: Result<(), RetryError> = with_retry(&config, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            async { Err(NetworkError::Timeout) }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
    }
}
