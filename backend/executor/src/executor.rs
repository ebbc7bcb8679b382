use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use holdfast_cache::CacheStore;
use holdfast_config::ExecutorConfig;
use holdfast_core::{ExecutionState, HoldfastError, Operation, Status};
use holdfast_scheduler::{RetryDecision, RetryPolicy, RetryScheduler};
use logging::{redact_sensitive_data, EventLogger, ExecutionEvent};

use crate::deadline::DeadlineGuard;

/// Bounds every result type must satisfy to flow through the executor.
pub trait ExecutorData: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> ExecutorData for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Bookkeeping for the one execution an executor may have in flight.
#[derive(Default)]
struct RunSlot {
    /// Token of the current run; cancels its in-flight operation and its
    /// pending retry timer.
    current: Option<CancellationToken>,
    disposed: bool,
}

struct Inner<T: ExecutorData> {
    config: ExecutorConfig,
    cache: CacheStore,
    operation: Arc<dyn Operation<T>>,
    guard: DeadlineGuard,
    scheduler: RetryScheduler,
    state_tx: watch::Sender<ExecutionState<T>>,
    slot: Mutex<RunSlot>,
    lifetime: CancellationToken,
}

impl<T: ExecutorData> Drop for Inner<T> {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

/// Wraps one operation with caching, a per-attempt deadline and linear
/// backoff retries.
///
/// Handles are cheap to clone and share one state machine. At most one
/// operation is in flight and at most one retry timer is pending per
/// executor; starting a new execution cancels both. Dropping the last handle
/// disposes the executor.
pub struct OperationExecutor<T: ExecutorData> {
    inner: Arc<Inner<T>>,
}

impl<T: ExecutorData> Clone for OperationExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ExecutorData> OperationExecutor<T> {
    /// Create an executor, seeding its state from a fresh cache entry if one
    /// exists. The cache is not read again afterwards.
    pub fn new(config: ExecutorConfig, cache: CacheStore, operation: impl Operation<T> + 'static) -> Self {
        Self::with_shared_operation(config, cache, Arc::new(operation))
    }

    pub fn with_shared_operation(
        config: ExecutorConfig,
        cache: CacheStore,
        operation: Arc<dyn Operation<T>>,
    ) -> Self {
        let cache = cache.with_freshness_window(config.freshness_window());

        let initial = match cache.read_fresh::<T>(&config.cache_key) {
            Some(entry) => {
                info!(
                    cache_key = %config.cache_key,
                    age_ms = entry.age_millis(cache.now_millis()),
                    "Seeded state from cache"
                );
                ExecutionState::from_cache(entry.data)
            }
            None => ExecutionState::default(),
        };
        let (state_tx, _) = watch::channel(initial);

        let policy = RetryPolicy::new(config.max_retries, config.retry_delay_ms);

        Self {
            inner: Arc::new(Inner {
                guard: DeadlineGuard::new(config.timeout()),
                scheduler: RetryScheduler::new(policy),
                config,
                cache,
                operation,
                state_tx,
                slot: Mutex::new(RunSlot::default()),
                lifetime: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    pub fn cache_key(&self) -> &str {
        &self.inner.config.cache_key
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ExecutionState<T> {
        self.inner.state_tx.borrow().clone()
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<ExecutionState<T>> {
        self.inner.state_tx.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.slot().disposed
    }

    /// Run the operation with a fresh retry budget.
    ///
    /// Returns the fresh data, or `None` if retries were exhausted, the run
    /// was superseded by a newer `execute()`/`retry()`, or the executor was
    /// disposed.
    pub async fn execute(&self) -> Option<T> {
        let Some(run) = self.begin_run() else {
            debug!(cache_key = %self.cache_key(), "execute() on disposed executor ignored");
            return None;
        };
        self.drive(run).await
    }

    /// Start over with a full retry budget. Identical to [`execute`].
    ///
    /// [`execute`]: OperationExecutor::execute
    pub async fn retry(&self) -> Option<T> {
        info!(cache_key = %self.cache_key(), "Manual retry requested");
        self.execute().await
    }

    /// Cancel any in-flight operation and pending retry, and refuse all
    /// further state transitions.
    pub fn dispose(&self) {
        let mut slot = self.slot();
        if slot.disposed {
            return;
        }
        slot.disposed = true;
        self.cancel_pending(&mut slot);
        self.inner.lifetime.cancel();
        info!(cache_key = %self.cache_key(), "Executor disposed");
    }

    fn slot(&self) -> MutexGuard<'_, RunSlot> {
        self.inner.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Cancel the current run's operation and retry timer.
    fn cancel_pending(&self, slot: &mut RunSlot) {
        if let Some(previous) = slot.current.take() {
            previous.cancel();
        }
        if self.inner.scheduler.cancel_pending() {
            debug!(cache_key = %self.cache_key(), "Cleared pending retry timer");
        }
    }

    /// Supersede whatever is running and hand out the token for a new run.
    fn begin_run(&self) -> Option<CancellationToken> {
        let mut slot = self.slot();
        if slot.disposed {
            return None;
        }
        self.cancel_pending(&mut slot);
        let run = self.inner.lifetime.child_token();
        slot.current = Some(run.clone());
        Some(run)
    }

    /// Apply `f` to the state unless `run` has been cancelled.
    ///
    /// The check and the mutation happen under the slot lock, so a
    /// superseding `begin_run` cannot slip in between.
    fn transition(&self, run: &CancellationToken, f: impl FnOnce(&mut ExecutionState<T>)) -> bool {
        let slot = self.slot();
        if slot.disposed || run.is_cancelled() {
            return false;
        }
        self.inner.state_tx.send_modify(f);
        true
    }

    async fn drive(&self, run: CancellationToken) -> Option<T> {
        let inner = &self.inner;
        let key = inner.config.cache_key.as_str();
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let mut plan = inner.scheduler.plan();

        self.transition(&run, |s| {
            s.status = Status::Loading;
            s.error_message = None;
            s.attempt = 0;
        });

        loop {
            let attempt = plan.current_attempt;
            EventLogger::log_event(run_id, key, ExecutionEvent::AttemptStarted { attempt });

            let err = match inner.guard.run(inner.operation.as_ref(), &run).await {
                Ok(data) => {
                    let applied = self.transition(&run, |s| {
                        s.data = Some(data.clone());
                        s.status = Status::Success;
                        s.error_message = None;
                        s.is_from_cache = false;
                        s.attempt = 0;
                    });
                    if !applied {
                        EventLogger::log_event(run_id, key, ExecutionEvent::Superseded);
                        return None;
                    }
                    // Only a result that reached the state is persisted.
                    inner.cache.write(key, &data);
                    EventLogger::log_event(
                        run_id,
                        key,
                        ExecutionEvent::Succeeded {
                            attempt,
                            elapsed_ms: started.elapsed().as_millis() as u64,
                        },
                    );
                    return Some(data);
                }
                Err(HoldfastError::Cancelled) => {
                    EventLogger::log_event(run_id, key, ExecutionEvent::Superseded);
                    return None;
                }
                Err(err) => err,
            };

            let message = err.user_message();
            EventLogger::log_event(
                run_id,
                key,
                ExecutionEvent::AttemptFailed {
                    attempt,
                    error_msg: message.clone(),
                    timed_out: err == HoldfastError::Timeout,
                },
            );

            match plan.record_failure(&redact_sensitive_data(&message)) {
                RetryDecision::Retry { attempt, delay } => {
                    let applied = self.transition(&run, |s| {
                        s.status = Status::Loading;
                        s.error_message = None;
                        s.attempt = attempt;
                    });
                    if !applied {
                        EventLogger::log_event(run_id, key, ExecutionEvent::Superseded);
                        return None;
                    }
                    EventLogger::log_event(
                        run_id,
                        key,
                        ExecutionEvent::RetryScheduled {
                            attempt,
                            delay_ms: delay.as_millis() as u64,
                        },
                    );
                    if !inner.scheduler.wait(delay, &run).await {
                        EventLogger::log_event(run_id, key, ExecutionEvent::Superseded);
                        return None;
                    }
                }
                RetryDecision::Exhausted { attempts_made } => {
                    let mut has_stale_data = false;
                    let applied = self.transition(&run, |s| {
                        s.status = Status::Failed;
                        s.error_message = Some(message.clone());
                        s.is_from_cache = s.data.is_some();
                        has_stale_data = s.is_from_cache;
                    });
                    if applied {
                        warn!(
                            cache_key = %key,
                            attempts = attempts_made,
                            error = %redact_sensitive_data(&message),
                            "Operation failed after retries"
                        );
                        EventLogger::log_event(
                            run_id,
                            key,
                            ExecutionEvent::Exhausted {
                                attempts: attempts_made,
                                error_msg: message,
                                has_stale_data,
                            },
                        );
                    } else {
                        EventLogger::log_event(run_id, key, ExecutionEvent::Superseded);
                    }
                    return None;
                }
            }
        }
    }
}
