//! The single pending retry timer owned by an executor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::retry::{RetryPlan, RetryPolicy};

struct PendingTimer {
    id: u64,
    cancel: CancellationToken,
}

/// Schedules retry delays and owns at most one pending timer.
///
/// Arming a new timer cancels the previous one.
pub struct RetryScheduler {
    policy: RetryPolicy,
    pending: Mutex<Option<PendingTimer>>,
    next_id: AtomicU64,
}

impl RetryScheduler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            pending: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// A fresh plan for a new top-level execution.
    pub fn plan(&self) -> RetryPlan {
        self.policy.plan()
    }

    /// Sleep for `delay` unless `cancel` (or [`cancel_pending`]) fires first.
    ///
    /// Returns `true` when the delay elapsed, `false` when it was cancelled.
    ///
    /// [`cancel_pending`]: RetryScheduler::cancel_pending
    pub async fn wait(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        let timer = cancel.child_token();
        let id = self.arm(timer.clone());

        let elapsed = tokio::select! {
            biased;
            _ = timer.cancelled() => false,
            _ = sleep(delay) => true,
        };

        self.disarm(id);
        if !elapsed {
            debug!(delay_ms = delay.as_millis() as u64, "Retry timer cancelled");
        }
        elapsed
    }

    /// Cancel the pending timer, if any. Returns whether one was pending.
    pub fn cancel_pending(&self) -> bool {
        let taken = self.pending.lock().unwrap_or_else(|p| p.into_inner()).take();
        match taken {
            Some(timer) => {
                timer.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().unwrap_or_else(|p| p.into_inner()).is_some()
    }

    fn arm(&self, cancel: CancellationToken) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = pending.replace(PendingTimer { id, cancel }) {
            previous.cancel.cancel();
        }
        id
    }

    fn disarm(&self, id: u64) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if pending.as_ref().is_some_and(|t| t.id == id) {
            *pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn stale_disarm_keeps_newer_timer() {
        let scheduler = RetryScheduler::new(RetryPolicy::default());
        let first = CancellationToken::new();
        let old = scheduler.arm(first.clone());
        let new = scheduler.arm(CancellationToken::new());
        assert!(new > old);
        assert!(first.is_cancelled());

        scheduler.disarm(old);
        assert!(scheduler.has_pending());
        scheduler.disarm(new);
        assert!(!scheduler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_elapses_after_delay() {
        let scheduler = RetryScheduler::new(RetryPolicy::default());
        let start = Instant::now();
        assert!(scheduler.wait(Duration::from_millis(1_000), &CancellationToken::new()).await);
        assert!(start.elapsed() >= Duration::from_millis(1_000));
        assert!(!scheduler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancel_stops_wait() {
        let scheduler = Arc::new(RetryScheduler::new(RetryPolicy::default()));
        let token = CancellationToken::new();

        let handle = {
            let scheduler = scheduler.clone();
            let token = token.clone();
            tokio::spawn(async move { scheduler.wait(Duration::from_secs(60), &token).await })
        };

        tokio::task::yield_now().await;
        assert!(scheduler.has_pending());
        token.cancel();
        assert!(!handle.await.unwrap());
        assert!(!scheduler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_stops_wait() {
        let scheduler = Arc::new(RetryScheduler::new(RetryPolicy::default()));

        let handle = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                scheduler.wait(Duration::from_secs(60), &CancellationToken::new()).await
            })
        };

        tokio::task::yield_now().await;
        assert!(scheduler.cancel_pending());
        assert!(!handle.await.unwrap());
        assert!(!scheduler.cancel_pending());
    }

    #[test]
    fn plan_starts_at_zero() {
        let scheduler = RetryScheduler::new(RetryPolicy::new(3, 50));
        let plan = scheduler.plan();
        assert_eq!(plan.current_attempt, 0);
        assert_eq!(plan.max_attempts, 3);
    }
}
