//! Deadline Guard: races an operation against a timeout.
//!
//! The operation receives a child of the caller's cancellation token. On
//! timeout that child is cancelled (the abort signal) and the operation
//! future is dropped, so nothing it produces later can be observed.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use holdfast_core::{normalize_error_message, HoldfastError, Operation, UNKNOWN_ERROR_MESSAGE};

/// Default deadline for one attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, Copy)]
pub struct DeadlineGuard {
    timeout: Duration,
}

impl Default for DeadlineGuard {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl DeadlineGuard {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one attempt of `operation` under this guard's deadline.
    pub async fn run<T: Send + 'static>(
        &self,
        operation: &dyn Operation<T>,
        cancel: &CancellationToken,
    ) -> Result<T, HoldfastError> {
        run_with_deadline(operation, self.timeout, cancel).await
    }
}

/// Run `operation` until it settles, `timeout` elapses, or `cancel` fires.
///
/// Exactly one outcome is returned:
/// - the operation's value, or `Operation(message)` if it failed or panicked
/// - `Timeout` if the deadline fired first
/// - `Cancelled` if `cancel` fired first
pub async fn run_with_deadline<T: Send + 'static>(
    operation: &dyn Operation<T>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T, HoldfastError> {
    if cancel.is_cancelled() {
        return Err(HoldfastError::Cancelled);
    }

    let abort = cancel.child_token();
    let attempt = AssertUnwindSafe(operation.run(abort.clone())).catch_unwind();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(HoldfastError::Cancelled),
        outcome = tokio::time::timeout(timeout, attempt) => match outcome {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => Err(HoldfastError::Operation(normalize_error_message(&e))),
            Ok(Err(_panic)) => {
                warn!("Operation panicked");
                Err(HoldfastError::Operation(UNKNOWN_ERROR_MESSAGE.to_string()))
            }
            Err(_elapsed) => {
                abort.cancel();
                warn!(timeout_ms = timeout.as_millis() as u64, "Operation exceeded deadline");
                Err(HoldfastError::Timeout)
            }
        },
    }
}
