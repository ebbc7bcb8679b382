use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A caller-supplied asynchronous producer of a result.
///
/// The token is cancelled when the attempt times out, is superseded, or the
/// owning executor is disposed. Honouring it is best-effort: any result
/// produced after cancellation is discarded by the caller.
#[async_trait]
pub trait Operation<T: Send + 'static>: Send + Sync {
    async fn run(&self, cancel: CancellationToken) -> Result<T>;
}

#[async_trait]
impl<T, F, Fut> Operation<T> for F
where
    T: Send + 'static,
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
{
    async fn run(&self, cancel: CancellationToken) -> Result<T> {
        (self)(cancel).await
    }
}

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}
