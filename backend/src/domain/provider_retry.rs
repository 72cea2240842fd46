//! Bounded retries for payment provider calls.
//!
//! Only [`PaymentProviderError::Transient`] failures are retried, with
//! jittered exponential backoff. Callers pass a closure that re-issues the
//! same request (same idempotency key), so a retried create returns the
//! intent the provider may already have made.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use super::ports::{PaymentProviderError, ProviderRetryPolicy};

/// Async sleeping abstraction so tests can observe delays without waiting.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return the delay to wait given the exponential base delay.
    fn jittered_delay(&self, base: Duration, attempt: u32) -> Duration;
}

/// Tokio-based sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Scales each delay by a random factor in `0.5..=1.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl BackoffJitter for RandomJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32) -> Duration {
        let factor = rand::thread_rng().gen_range(0.5..=1.0);
        base.mul_f64(factor)
    }
}

/// Retry executor for provider calls.
#[derive(Clone)]
pub struct ProviderRetry {
    policy: ProviderRetryPolicy,
    sleeper: Arc<dyn RetrySleeper>,
    jitter: Arc<dyn BackoffJitter>,
}

impl ProviderRetry {
    pub fn new(
        policy: ProviderRetryPolicy,
        sleeper: Arc<dyn RetrySleeper>,
        jitter: Arc<dyn BackoffJitter>,
    ) -> Self {
        Self {
            policy,
            sleeper,
            jitter,
        }
    }

    /// Tokio sleeping and random jitter.
    pub fn with_policy(policy: ProviderRetryPolicy) -> Self {
        Self::new(policy, Arc::new(TokioSleeper), Arc::new(RandomJitter))
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.policy
            .base_delay
            .saturating_mul(exponent)
            .min(self.policy.max_delay)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, PaymentProviderError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, PaymentProviderError>> + Send,
        T: Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < max_attempts => {
                    let delay = self
                        .jitter
                        .jittered_delay(self.base_delay(attempt), attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "retrying payment provider call"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::retry::{NoJitter, RecordingSleeper};
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn retry(sleeper: Arc<RecordingSleeper>) -> ProviderRetry {
        ProviderRetry::new(
            ProviderRetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(100),
                max_delay: Duration::from_millis(150),
            },
            sleeper,
            Arc::new(NoJitter),
        )
    }

    #[tokio::test]
    async fn retries_transient_failures_with_capped_backoff() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = AtomicU32::new(0);
        let result = retry(sleeper.clone())
            .run("create_intent", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(PaymentProviderError::transient("timeout"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.expect("third attempt succeeds"), 2);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(100), Duration::from_millis(150)]
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(sleeper.clone())
            .run("create_intent", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PaymentProviderError::transient("down")) }
            })
            .await;

        assert!(result.expect_err("exhausted").is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.delays().len(), 2);
    }

    #[rstest]
    #[case(PaymentProviderError::rejected("card declined"))]
    #[case(PaymentProviderError::decode("bad json"))]
    #[tokio::test]
    async fn permanent_failures_are_not_retried(#[case] failure: PaymentProviderError) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(sleeper.clone())
            .run("retrieve_intent", || {
                calls.fetch_add(1, Ordering::SeqCst);
                let failure = failure.clone();
                async move { Err(failure) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays().is_empty());
    }
}
