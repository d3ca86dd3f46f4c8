//! Dispatcher.
//!
//! Routes every operation through the lock domain manager and runs it either
//! inline (blocking API) or on the bounded worker pool (`_async` API).
//!
//! # Architecture
//!
//! ```text
//! call_sync(op)                      call_async(op)
//!   │ acquire ticket                   │ acquire ticket (FIFO position fixed now)
//!   │ block until granted              │ spawn scheduler task ──► await grant
//!   ▼                                  │                         ▼
//! execute(op) ◄────────────────────────┼──────────── pool worker: execute(op)
//!   │ classify                         │                         │
//!   ▼                                  ▼                         ▼
//! Result<T, ErrorRecord>           OperationFuture<T> ◄──── settle, then release
//! ```

mod dispatcher;
mod future;
mod operation;
mod pool;

pub use future::OperationFuture;
pub use pool::{PoolStats, DEFAULT_SCHEDULER_THREADS};

pub(crate) use dispatcher::{call_async, call_sync};
pub(crate) use operation::{close_operation, OperationContext, PendingOperation};
pub(crate) use pool::{PoolHandle, WorkerPool};
