use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::pool::pool_shutdown_error;
use crate::error::ErrorRecord;

/// The settlement of a non-blocking call.
///
/// Resolves to exactly what the blocking form of the same call would return.
/// Dropping the future abandons the result but not the call: the native
/// operation still runs to completion, and any resource it created is
/// released through the finalizer.
#[must_use = "futures do nothing unless awaited; the call runs regardless"]
pub struct OperationFuture<T> {
    settled: oneshot::Receiver<Result<T, ErrorRecord>>,
}

impl<T> OperationFuture<T> {
    pub(crate) fn new(settled: oneshot::Receiver<Result<T, ErrorRecord>>) -> Self {
        Self { settled }
    }

    /// A future that is already settled.
    pub(crate) fn ready(result: Result<T, ErrorRecord>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self::new(rx)
    }
}

impl<T> Future for OperationFuture<T> {
    type Output = Result<T, ErrorRecord>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.settled)
            .poll(cx)
            .map(|settled| settled.unwrap_or_else(|_| Err(pool_shutdown_error())))
    }
}

impl<T> fmt::Debug for OperationFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationFuture").finish_non_exhaustive()
    }
}
