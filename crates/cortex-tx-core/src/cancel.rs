//! Cooperative cancellation for in-flight requests.
//!
//! A request attempt owns one merged [`CancelToken`] that fires when either the
//! caller's token fires or the attempt's timeout elapses, whichever comes first.
//! The transport polls the token (curl's progress callback) and the dispatcher
//! awaits it, so both the blocking transfer and the waiting task stop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const LIVE: u8 = 0;
const BY_CALLER: u8 = 1;
const BY_TIMEOUT: u8 = 2;

/// Why a token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller cancelled explicitly.
    Caller,
    /// The attempt exceeded its time budget.
    Timeout,
}

#[derive(Debug, Default)]
struct Inner {
    state: AtomicU8,
    notify: Notify,
}

/// Shared cancellation flag. Clones observe the same state; the first reason wins.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel on behalf of the caller. Returns false if the token had already fired.
    pub fn cancel(&self) -> bool {
        self.cancel_with(CancelReason::Caller)
    }

    /// Fire with `reason`. Only the first call has an effect.
    pub fn cancel_with(&self, reason: CancelReason) -> bool {
        let code = match reason {
            CancelReason::Caller => BY_CALLER,
            CancelReason::Timeout => BY_TIMEOUT,
        };
        let fired = self
            .inner
            .state
            .compare_exchange(LIVE, code, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if fired {
            self.inner.notify.notify_waiters();
        }
        fired
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) != LIVE
    }

    pub fn reason(&self) -> Option<CancelReason> {
        match self.inner.state.load(Ordering::Acquire) {
            BY_CALLER => Some(CancelReason::Caller),
            BY_TIMEOUT => Some(CancelReason::Timeout),
            _ => None,
        }
    }

    /// Resolves once the token has fired.
    pub async fn cancelled(&self) {
        loop {
            // Registered on creation, so a notify between the check and the await is not lost.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Fire this token when `caller` fires or `timeout` elapses, whichever is first,
    /// and return the reason the token ended up with.
    pub async fn trip_on(&self, caller: Option<&CancelToken>, timeout: Duration) -> CancelReason {
        let caller_fired = async {
            match caller {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let reason = tokio::select! {
            _ = caller_fired => CancelReason::Caller,
            _ = self.cancelled() => self.reason().unwrap_or(CancelReason::Caller),
            _ = tokio::time::sleep(timeout) => CancelReason::Timeout,
        };
        self.cancel_with(reason);
        self.reason().unwrap_or(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn first_reason_wins_and_repeat_cancel_is_noop() {
        let t = CancelToken::new();
        assert!(!t.is_cancelled());
        assert!(t.cancel_with(CancelReason::Timeout));
        assert!(!t.cancel());
        assert!(!t.cancel_with(CancelReason::Timeout));
        assert_eq!(t.reason(), Some(CancelReason::Timeout));
    }

    #[test]
    fn clones_share_state() {
        let t = CancelToken::new();
        let c = t.clone();
        c.cancel();
        assert!(t.is_cancelled());
        assert_eq!(t.reason(), Some(CancelReason::Caller));
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel_from_another_task() {
        let t = CancelToken::new();
        let c = t.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            c.cancel();
        });
        tokio::time::timeout(Duration::from_secs(2), t.cancelled())
            .await
            .expect("token should fire");
    }

    #[tokio::test]
    async fn trip_on_timeout_without_caller() {
        let merged = CancelToken::new();
        let start = Instant::now();
        let reason = merged.trip_on(None, Duration::from_millis(50)).await;
        assert_eq!(reason, CancelReason::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(merged.reason(), Some(CancelReason::Timeout));
    }

    #[tokio::test]
    async fn trip_on_caller_before_timeout() {
        let merged = CancelToken::new();
        let caller = CancelToken::new();
        let c = caller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            c.cancel();
        });
        let reason = merged.trip_on(Some(&caller), Duration::from_secs(5)).await;
        assert_eq!(reason, CancelReason::Caller);
        assert_eq!(merged.reason(), Some(CancelReason::Caller));
    }

    #[tokio::test]
    async fn trip_on_already_cancelled_caller_fires_immediately() {
        let merged = CancelToken::new();
        let caller = CancelToken::new();
        caller.cancel();
        let reason = tokio::time::timeout(
            Duration::from_secs(1),
            merged.trip_on(Some(&caller), Duration::from_secs(5)),
        )
        .await
        .expect("should not wait for the timeout");
        assert_eq!(reason, CancelReason::Caller);
    }
}
