use hoplink_core::CacheError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry with exponential backoff for transient cache errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(8),
            max_delay: Duration::from_millis(512),
        }
    }
}

/// Whether an error is worth retrying. Validation and serialization
/// failures are deterministic and never retried.
pub fn is_transient(err: &CacheError) -> bool {
    matches!(err, CacheError::Unavailable(_) | CacheError::Timeout(_))
}

/// Runs `operation` up to `policy.attempts` times, backing off
/// exponentially between attempts.
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, CacheError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CacheError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation = operation_name, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if is_transient(&err) && attempt + 1 < policy.attempts => {
                let delay = policy
                    .base_delay
                    .saturating_mul(2u32.saturating_pow(attempt))
                    .min(policy.max_delay);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient cache error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retry("op", RetryPolicy::default(), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>(42)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_up_to_limit() {
        let calls = Arc::new(AtomicU32::new(0));
        let err = with_retry("op", RetryPolicy::default(), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CacheError::Unavailable("down".to_string()))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CacheError::Unavailable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_deterministic_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let err = with_retry("op", RetryPolicy::default(), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CacheError::Serialization("bad".to_string()))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CacheError::Serialization(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_mid_sequence() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retry("op", RetryPolicy::default(), || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                    Err(CacheError::Timeout("slow".to_string()))
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
