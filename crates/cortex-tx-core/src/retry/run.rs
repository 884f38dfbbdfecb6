//! Retry loop: run an async operation until success or the policy says stop.

use super::classify::classify;
use super::descriptor::ErrorDescriptor;
use super::error::RequestError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::cancel::{CancelReason, CancelToken};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Caller-supplied veto: return false to stop retrying a retryable failure.
pub type RetryPredicate = Arc<dyn Fn(&ErrorDescriptor) -> bool + Send + Sync>;

/// Delay primitive used between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(delay)
    }
}

/// Runs operations under a [`RetryPolicy`], an optional predicate and a delay primitive.
#[derive(Clone)]
pub struct Retrier<S = TokioSleeper> {
    policy: RetryPolicy,
    predicate: Option<RetryPredicate>,
    sleeper: S,
}

impl Retrier<TokioSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            predicate: None,
            sleeper: TokioSleeper,
        }
    }
}

impl Default for Retrier<TokioSleeper> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<S: Sleeper> Retrier<S> {
    /// Replace the delay primitive (tests record delays instead of sleeping).
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> Retrier<S2> {
        Retrier {
            policy: self.policy,
            predicate: self.predicate,
            sleeper,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ErrorDescriptor) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `op` until it succeeds, fails with a non-retryable error, the
    /// predicate vetoes a retry, or the attempt budget is spent. The error is
    /// the descriptor of the last failure.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, ErrorDescriptor>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        self.run_until_cancelled(None, op).await
    }

    /// Like [`run`](Self::run), but stops as soon as `cancel` fires: no new
    /// attempt starts and a pending backoff delay is cut short.
    pub async fn run_until_cancelled<T, F, Fut>(
        &self,
        cancel: Option<&CancelToken>,
        mut op: F,
    ) -> Result<T, ErrorDescriptor>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let mut attempt = 0u32;
        loop {
            if let Some(reason) = cancel.and_then(CancelToken::reason) {
                tracing::debug!(attempt, ?reason, "cancelled before attempt");
                return Err(classify(RequestError::Aborted(reason)));
            }
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => classify(e),
            };
            let decision = match &self.predicate {
                Some(allow) if err.retryable() && !allow(&err) => RetryDecision::NoRetry,
                _ => self.policy.decide(attempt, &err),
            };
            match decision {
                RetryDecision::NoRetry => {
                    tracing::debug!(attempt, kind = ?err.kind(), "giving up: {}", err);
                    return Err(err);
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::debug!(
                        attempt,
                        kind = ?err.kind(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying after failure: {}",
                        err
                    );
                    if let Some(token) = cancel {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => {
                                let reason = token.reason().unwrap_or(CancelReason::Caller);
                                tracing::debug!(attempt, ?reason, "cancelled during backoff");
                                return Err(classify(RequestError::Aborted(reason)));
                            }
                            _ = self.sleeper.sleep(delay) => {}
                        }
                    } else {
                        self.sleeper.sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Runs `op` under `policy` with the tokio timer and no predicate.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, ErrorDescriptor>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    Retrier::new(*policy).run(op).await
}
