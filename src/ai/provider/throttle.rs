//! Throttle Retry Policy
//!
//! Wraps one provider call. A throttled failure waits (upstream hint plus
//! padding, or a flat default) and gets exactly one more attempt with the
//! same arguments. Every other failure is final on the first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryConfig;
use crate::types::{ProviderError, ProviderResult};

#[derive(Debug, Clone)]
pub struct ThrottlePolicy {
    /// Wait when upstream gives no hint
    default_wait: Duration,
    /// Added on top of an upstream hint
    padding: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl ThrottlePolicy {
    pub fn new(default_wait: Duration, padding: Duration) -> Self {
        Self {
            default_wait,
            padding,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_secs(config.default_wait_secs),
            Duration::from_secs(config.padding_secs),
        )
    }

    /// How long to wait before the retry of a throttled call
    pub fn wait_for(&self, err: &ProviderError) -> Duration {
        match err.retry_after {
            Some(hint) => hint + self.padding,
            None => self.default_wait,
        }
    }

    /// Run `op`, retrying once if the first attempt is throttled
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        match op().await {
            Err(err) if err.is_throttled() => {
                let wait = self.wait_for(&err);
                warn!(
                    "{} throttled ({}); retrying once in {:?}",
                    label,
                    err.diagnostic(),
                    wait
                );
                tokio::time::sleep(wait).await;
                op().await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn throttled(retry_after: Option<u64>) -> ProviderError {
        let err = ProviderError::with_provider(ErrorCategory::RateLimit, "throttled", "replicate");
        match retry_after {
            Some(secs) => err.retry_after(Duration::from_secs(secs)),
            None => err,
        }
    }

    #[test]
    fn test_wait_for() {
        let policy = ThrottlePolicy::default();
        assert_eq!(policy.wait_for(&throttled(Some(5))), Duration::from_secs(6));
        assert_eq!(policy.wait_for(&throttled(None)), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_once_after_hint() {
        let policy = ThrottlePolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let counter = attempts.clone();
        let result = policy
            .run("flux", || {
                let counter = counter.clone();
                async move {
                    match counter.fetch_add(1, Ordering::SeqCst) {
                        0 => Err(throttled(Some(5))),
                        _ => Ok("image"),
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "image");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_third_attempt() {
        let policy = ThrottlePolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: ProviderResult<()> = policy
            .run("flux", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(throttled(Some(5)))
                }
            })
            .await;

        assert!(result.unwrap_err().is_throttled());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_wait_without_hint() {
        let policy = ThrottlePolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let counter = attempts.clone();
        let _ = policy
            .run("gpt", || {
                let counter = counter.clone();
                async move {
                    match counter.fetch_add(1, Ordering::SeqCst) {
                        0 => Err(throttled(None)),
                        _ => Ok(()),
                    }
                }
            })
            .await;

        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_throttle_failure_not_retried() {
        let policy = ThrottlePolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let counter = attempts.clone();
        let result: ProviderResult<()> = policy
            .run("gpt", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::new(ErrorCategory::Unavailable, "model not found"))
                }
            })
            .await;

        assert_eq!(result.unwrap_err().message, "model not found");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
