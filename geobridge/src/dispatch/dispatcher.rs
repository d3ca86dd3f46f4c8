//! One execution path, two adapters.
//!
//! [`execute`] is the only code that runs a native call: it invokes the
//! operation, catches an unwinding engine, classifies the outcome and reports
//! telemetry. [`call_sync`] and [`call_async`] differ only in where `execute`
//! runs and how its result is delivered, which is what keeps errors from the
//! two call styles identical.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::oneshot;

use super::future::OperationFuture;
use super::operation::{OperationContext, PendingOperation};
use crate::error::ErrorRecord;
use crate::outcome::{classify, Failure};
use crate::state::BridgeCore;
use crate::telemetry::{CallMode, TelemetryEvent};

/// Runs an operation whose domains are already held.
pub(crate) fn execute<T>(
    core: &Arc<BridgeCore>,
    op: PendingOperation<T>,
    mode: CallMode,
) -> Result<T, ErrorRecord> {
    let name = op.name();
    let started = Instant::now();

    let ctx = OperationContext::new(core);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| op.run(&ctx)))
        .unwrap_or_else(|payload| Err(Failure::from_panic(payload)));
    let result = classify(outcome, &core.shim, core.version);

    core.telemetry.emit(TelemetryEvent::OperationCompleted {
        operation: name,
        mode,
        duration: started.elapsed(),
        error: result.as_ref().err().map(|e| e.kind()),
    });
    result
}

/// Blocking adapter: waits for the domains on the calling thread, then runs
/// the native call inline.
pub(crate) fn call_sync<T>(core: &Arc<BridgeCore>, op: PendingOperation<T>) -> Result<T, ErrorRecord> {
    let mut ticket = core.domains.acquire(op.scope());
    ticket.wait_blocking();
    let result = execute(core, op, CallMode::Sync);
    drop(ticket);
    result
}

/// Non-blocking adapter: takes a place in the lock queues now, runs the call on
/// the worker pool once the domains are free, and settles the returned future.
///
/// The result is delivered before the domains are released, so the next
/// operation on the same domain cannot complete ahead of this one.
///
/// Once the pool is gone the call runs inline instead, so a handle that
/// outlived its bridge reports the same error in both call styles.
pub(crate) fn call_async<T>(core: &Arc<BridgeCore>, op: PendingOperation<T>) -> OperationFuture<T>
where
    T: Send + 'static,
{
    if core.pool.is_shut_down() {
        return OperationFuture::ready(call_sync(core, op));
    }

    let (tx, rx) = oneshot::channel();
    let mut ticket = core.domains.acquire(op.scope());

    let task_core = Arc::clone(core);
    core.pool.spawn(async move {
        ticket.wait().await;

        let worker_core = Arc::clone(&task_core);
        let result = task_core
            .pool
            .run_blocking(move || execute(&worker_core, op, CallMode::Async))
            .await
            .and_then(|result| result);

        // An abandoned future drops the result here; handles inside it are
        // finalized like any other unreachable handle.
        let _ = tx.send(result);
        drop(ticket);
    });

    OperationFuture::new(rx)
}
