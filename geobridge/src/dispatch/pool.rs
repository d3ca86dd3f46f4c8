//! Bounded worker pool for non-blocking calls.
//!
//! The pool owns a dedicated multi-threaded tokio runtime. A small number of
//! scheduler threads wait on lock tickets; native calls run on the runtime's
//! blocking threads, capped at the pool capacity both by the runtime and by a
//! semaphore that also feeds the in-flight statistics.
//!
//! Work beyond capacity queues on the semaphore instead of spawning more
//! execution contexts.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;

use crate::error::ErrorRecord;

// =============================================================================
// Pool Configuration Constants
// =============================================================================

/// Threads that drive async waiting; native calls never run on them.
pub const DEFAULT_SCHEDULER_THREADS: usize = 1;

const THREAD_NAME: &str = "geobridge-pool";

/// Message of the error an async call settles with once the pool is gone.
pub(crate) const POOL_SHUTDOWN_MESSAGE: &str = "worker pool has shut down";

pub(crate) fn pool_shutdown_error() -> ErrorRecord {
    ErrorRecord::aborted(POOL_SHUTDOWN_MESSAGE)
}

// =============================================================================
// Statistics
// =============================================================================

/// Point-in-time worker pool statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Maximum concurrent native calls.
    pub capacity: usize,
    /// Native calls executing right now.
    pub in_flight: usize,
    /// Highest `in_flight` ever observed.
    pub peak_in_flight: usize,
    /// Calls waiting for a free worker.
    pub waiting: usize,
    /// Native calls finished on the pool.
    pub completed: u64,
}

#[derive(Debug, Default)]
struct PoolCounters {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    waiting: AtomicUsize,
    completed: AtomicU64,
}

impl PoolCounters {
    /// Updates the peak counter if current exceeds it.
    fn update_peak(&self, current: usize) {
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }
}

/// Counts a running native call for as long as it lives.
struct RunningGuard {
    counters: Arc<PoolCounters>,
}

impl RunningGuard {
    fn enter(counters: Arc<PoolCounters>) -> Self {
        let current = counters.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        counters.update_peak(current);
        Self { counters }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Counts a call waiting for a permit, including one abandoned mid-wait.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Cloneable access to the pool's runtime and capacity limiter.
///
/// Holding a `PoolHandle` does not keep the runtime alive; once the owning
/// [`WorkerPool`] is dropped, spawned work is discarded.
#[derive(Clone, Debug)]
pub(crate) struct PoolHandle {
    runtime: tokio::runtime::Handle,
    semaphore: Arc<Semaphore>,
    counters: Arc<PoolCounters>,
    capacity: usize,
}

impl PoolHandle {
    /// Spawns a scheduling task. Never runs native code directly.
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Detached; completion is reported through the task's own channel.
        drop(self.runtime.spawn(task));
    }

    /// True once the owning [`WorkerPool`] has been dropped.
    pub(crate) fn is_shut_down(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Runs `work` on a pool worker once one is free.
    pub(crate) async fn run_blocking<T, F>(&self, work: F) -> Result<T, ErrorRecord>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let permit = {
            let _waiting = WaitingGuard::enter(&self.counters.waiting);
            Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|_| pool_shutdown_error())?
        };

        let counters = Arc::clone(&self.counters);
        let joined = self
            .runtime
            .spawn_blocking(move || {
                let _permit = permit;
                let _running = RunningGuard::enter(counters);
                work()
            })
            .await;

        joined.map_err(|_| pool_shutdown_error())
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
            peak_in_flight: self.counters.peak_in_flight.load(Ordering::Relaxed),
            waiting: self.counters.waiting.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
        }
    }
}

/// Owns the pool runtime.
pub(crate) struct WorkerPool {
    runtime: Option<Runtime>,
    handle: PoolHandle,
}

impl WorkerPool {
    /// Builds a pool running at most `workers` native calls at once.
    pub(crate) fn new(workers: usize, scheduler_threads: usize) -> io::Result<Self> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(scheduler_threads.max(1))
            .max_blocking_threads(workers)
            .thread_name(THREAD_NAME)
            .enable_all()
            .build()?;

        let handle = PoolHandle {
            runtime: runtime.handle().clone(),
            semaphore: Arc::new(Semaphore::new(workers)),
            counters: Arc::new(PoolCounters::default()),
            capacity: workers,
        };

        tracing::debug!(workers, scheduler_threads, "Worker pool started");

        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    pub(crate) fn handle(&self) -> &PoolHandle {
        &self.handle
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Dropping a runtime from async context panics; shutting down in the
        // background is safe from anywhere.
        if let Some(runtime) = self.runtime.take() {
            self.handle.semaphore.close();
            runtime.shutdown_background();
            tracing::debug!("Worker pool shut down");
        }
    }
}
