use super::descriptor::ErrorDescriptor;
use crate::config::RetryConfig;
use std::time::Duration;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy without a delay cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts after the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each retry after that.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            base_delay: Duration::from_millis(cfg.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `base_delay * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Decide what to do after attempt `attempt` (0-based) failed with `error`.
    pub fn decide(&self, attempt: u32, error: &ErrorDescriptor) -> RetryDecision {
        if !error.retryable() || attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelReason;
    use crate::retry::{classify, RequestError};

    fn server_error() -> ErrorDescriptor {
        classify(RequestError::Http {
            status: 503,
            body: String::new(),
        })
    }

    #[test]
    fn no_retry_for_client_errors() {
        let p = RetryPolicy::default();
        let d = classify(RequestError::Http {
            status: 400,
            body: String::new(),
        });
        assert_eq!(p.decide(0, &d), RetryDecision::NoRetry);
    }

    #[test]
    fn backoff_doubles_from_base() {
        let p = RetryPolicy::default();
        let d = classify(RequestError::Aborted(CancelReason::Timeout));
        assert_eq!(p.decide(0, &d), RetryDecision::RetryAfter(Duration::from_millis(1000)));
        assert_eq!(p.decide(1, &d), RetryDecision::RetryAfter(Duration::from_millis(2000)));
        assert_eq!(p.decide(2, &d), RetryDecision::RetryAfter(Duration::from_millis(4000)));
    }

    #[test]
    fn respects_max_attempts() {
        let p = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
        };
        let d = server_error();
        assert!(matches!(p.decide(0, &d), RetryDecision::RetryAfter(_)));
        assert!(matches!(p.decide(1, &d), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(2, &d), RetryDecision::NoRetry);
    }

    #[test]
    fn zero_budget_never_retries() {
        let p = RetryPolicy {
            max_attempts: 0,
            base_delay: Duration::from_millis(10),
        };
        assert_eq!(p.decide(0, &server_error()), RetryDecision::NoRetry);
    }

    #[test]
    fn huge_attempt_saturates_instead_of_overflowing() {
        let p = RetryPolicy {
            max_attempts: u32::MAX,
            base_delay: Duration::from_secs(1),
        };
        assert!(p.backoff(40) >= p.backoff(31));
        assert!(matches!(
            p.decide(200, &server_error()),
            RetryDecision::RetryAfter(_)
        ));
    }

    #[test]
    fn built_from_config() {
        let cfg = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 250,
        };
        let p = RetryPolicy::from(&cfg);
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.base_delay, Duration::from_millis(250));
    }
}
