//! Retry policy for control-plane reads (exponential backoff)
//!
//! IAM changes made by the provisioning run are eventually consistent: a role
//! created seconds ago may still be rejected with `AccessDenied`. Reads are therefore
//! retried for that error class only, with a fixed attempt ceiling.

use crate::error::{CloudError, Result};
use crate::model::{ResourcePolicy, TagSet};
use crate::provider::BucketInspector;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Classifies an error as worth another attempt
pub type RetryPredicate = fn(&CloudError) -> bool;

/// Attempt ceiling, retryable-error predicate and backoff function in one value.
///
/// The policy is immutable and shared by every concurrent case. Each call to
/// [`RetryPolicy::run`] keeps its own attempt counter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,

    /// Which errors are retried
    pub retryable: RetryPredicate,
}

impl RetryPolicy {
    /// Policy for the post-provisioning window where new roles may be denied
    pub fn transient_authorization() -> Self {
        Self {
            max_attempts: 7,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            retryable: CloudError::is_access_denied,
        }
    }

    /// Single attempt, nothing is retried
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            retryable: |_| false,
            ..Self::transient_authorization()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_retryable(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_retryable(&self, error: &CloudError) -> bool {
        (self.retryable)(error)
    }

    /// Delay to wait after the given (zero-based) failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or the
    /// attempt ceiling is reached.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            attempt += 1;

            if !self.is_retryable(&err) {
                return Err(err);
            }

            if attempt >= max_attempts {
                tracing::warn!(
                    operation,
                    attempts = attempt,
                    "Retry budget exhausted: {}",
                    err
                );
                return Err(CloudError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.delay_for_attempt(attempt - 1);
            tracing::warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Retryable error: {}",
                err
            );
            sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::transient_authorization()
    }
}

/// [`BucketInspector`] that applies a [`RetryPolicy`] to every read
pub struct ResilientInspector<I> {
    inner: I,
    policy: RetryPolicy,
}

impl<I: BucketInspector> ResilientInspector<I> {
    pub fn new(inner: I, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }
}

#[async_trait]
impl<I: BucketInspector> BucketInspector for ResilientInspector<I> {
    async fn lifecycle_policy(&self, bucket: &str) -> Result<ResourcePolicy> {
        self.policy
            .run("GetBucketLifecycleConfiguration", || {
                self.inner.lifecycle_policy(bucket)
            })
            .await
    }

    async fn tags(&self, bucket: &str) -> Result<TagSet> {
        self.policy
            .run("GetBucketTagging", || self.inner.tags(bucket))
            .await
    }
}
