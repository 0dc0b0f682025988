//! Retry with exponential backoff for LLM calls.
//!
//! Transient errors (see [`LlmError::is_transient`]) are retried up to
//! `max_attempts` total attempts; permanent errors return immediately. The
//! last error is returned unchanged so callers can tell "gave up after
//! retries" from "will never work".

use std::future::Future;
use std::time::Duration;

use redflag_types::config::RetryConfig;
use redflag_types::llm::LlmError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            multiplier: config.multiplier.max(1.0),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based).
    ///
    /// A provider hint replaces the exponential delay; both are capped at
    /// `max_backoff`.
    pub fn backoff_for(&self, attempt: u32, hint_ms: Option<u64>) -> Duration {
        let delay = match hint_ms {
            Some(ms) => Duration::from_millis(ms),
            None => {
                let exp = attempt.saturating_sub(1).min(16) as i32;
                self.initial_backoff.mul_f64(self.multiplier.powi(exp))
            }
        };
        delay.min(self.max_backoff)
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, LlmError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.backoff_for(attempt, err.retry_after_ms());
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_transient() {
                    tracing::error!(operation, attempt, error = %err, "giving up after retries");
                } else {
                    tracing::error!(operation, attempt, error = %err, "permanent failure");
                }
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            multiplier: 2.0,
            max_backoff: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_backoff_exponential_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(3),
        };
        assert_eq!(policy.backoff_for(1, None), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2, None), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(3, None), Duration::from_millis(2000));
        assert_eq!(policy.backoff_for(4, None), Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_hint_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1, Some(1200)), Duration::from_millis(1200));
        assert_eq!(policy.backoff_for(1, Some(60_000)), Duration::from_secs(8));
    }

    #[test]
    fn test_zero_attempts_config_means_one() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        });
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = retry_with_backoff(&fast_policy(3), "test", move |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(LlmError::Overloaded("busy".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = retry_with_backoff(&fast_policy(3), "test", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Timeout) }
        })
        .await;
        assert!(matches!(result, Err(LlmError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = retry_with_backoff(&fast_policy(5), "test", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::AuthenticationFailed) }
        })
        .await;
        assert!(matches!(result, Err(LlmError::AuthenticationFailed)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = retry_with_backoff(&fast_policy(2), "test", move |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 1 {
                    Err(LlmError::RateLimited { retry_after_ms: Some(2) })
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
