//! Bounded timeouts and retry for calls into backing stores.

use std::future::Future;
use std::time::Duration;

use carelink_core::{AppError, AppResult};
use tracing::warn;

/// Default per-call store timeout.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default attempt budget for idempotent reads.
pub const DEFAULT_STORE_MAX_ATTEMPTS: u32 = 3;

/// Default backoff before the first read retry.
pub const DEFAULT_STORE_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Timeout and retry settings applied to every store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCallPolicy {
    /// Upper bound for a single call.
    pub timeout: Duration,
    /// Total attempts for idempotent reads, at least one.
    pub max_attempts: u32,
    /// Backoff before the first retry, doubled per attempt.
    pub base_delay: Duration,
}

impl Default for StoreCallPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_STORE_TIMEOUT,
            max_attempts: DEFAULT_STORE_MAX_ATTEMPTS,
            base_delay: DEFAULT_STORE_RETRY_BASE_DELAY,
        }
    }
}

impl StoreCallPolicy {
    /// Runs a mutating call once under the timeout.
    pub async fn write<T, Fut>(&self, operation: &'static str, call: Fut) -> AppResult<T>
    where
        Fut: Future<Output = AppResult<T>>,
    {
        self.bounded(operation, call).await
    }

    /// Runs an idempotent read, retrying transient failures with exponential backoff.
    pub async fn read<T, F, Fut>(&self, operation: &'static str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.bounded(operation, call()).await {
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "retrying transient store failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1_u32 << exponent)
    }

    /// Runs any call once under the timeout, mapping an elapsed timeout to a transient error.
    pub(crate) async fn bounded<T, Fut>(&self, operation: &'static str, call: Fut) -> AppResult<T>
    where
        Fut: Future<Output = AppResult<T>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                AppError::Transient(format!(
                    "{operation} timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use carelink_core::AppError;

    use super::StoreCallPolicy;

    fn fast_policy() -> StoreCallPolicy {
        StoreCallPolicy {
            timeout: Duration::from_millis(50),
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn read_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .read("test_read", || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if attempt < 3 {
                        Err(AppError::Transient("connection reset".to_owned()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.ok(), Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn read_gives_up_after_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> = fast_policy()
            .read("test_read", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Transient("down".to_owned())) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn read_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> = fast_policy()
            .read("test_read", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::NotFound("missing".to_owned())) }
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_calls_surface_as_transient() {
        let result: Result<(), AppError> = fast_policy()
            .write("test_write", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(AppError::Transient(_))));
    }
}
