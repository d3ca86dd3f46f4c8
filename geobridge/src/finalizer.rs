//! Reachability-driven release.
//!
//! When the last clone of a still-open [`Handle`](crate::Handle) is dropped,
//! the handle schedules its own close here. The close goes through the
//! non-blocking dispatch path, so it waits its turn in the resource's lock
//! domains without ever blocking the dropping thread, and it is mutually
//! exclusive with every other operation on those domains.
//!
//! Release failures are logged and reported as telemetry. They never reach
//! user code.
//!
//! [`Finalizer::reclaim`] is the explicit reclamation trigger: it returns once
//! every finalization scheduled so far has completed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

use crate::dispatch::{self, close_operation};
use crate::registry::ResourceRef;
use crate::state::BridgeCore;
use crate::telemetry::{CloseOrigin, TelemetryEvent};

#[derive(Debug, Default)]
pub(crate) struct Finalizer {
    pending: Mutex<usize>,
    idle: Condvar,
    idle_async: Notify,
    scheduled: AtomicU64,
    failed: AtomicU64,
}

/// Finalizer counters reported by [`crate::Bridge::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FinalizerStats {
    pub pending: usize,
    pub scheduled: u64,
    pub failed: u64,
}

/// Marks one finalization as finished when dropped, however it ended.
struct PendingGuard {
    core: Arc<BridgeCore>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.core.finalizer.finish();
    }
}

impl Finalizer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues the close of an unreachable resource. Never blocks.
    pub(crate) fn schedule(core: &Arc<BridgeCore>, resource: ResourceRef) {
        let finalizer = &core.finalizer;
        *finalizer.pending.lock() += 1;
        finalizer.scheduled.fetch_add(1, Ordering::Relaxed);

        core.telemetry.emit(TelemetryEvent::FinalizerScheduled {
            id: resource.id,
            kind: resource.kind,
        });

        let closing = dispatch::call_async(core, close_operation(resource, CloseOrigin::Finalizer));
        let guard = PendingGuard {
            core: Arc::clone(core),
        };

        core.pool.spawn(async move {
            let result = closing.await;
            if let Err(err) = result {
                tracing::warn!(
                    resource = %resource,
                    error = %err,
                    "Failed to finalize resource"
                );
                guard.core.finalizer.failed.fetch_add(1, Ordering::Relaxed);
                guard.core.telemetry.emit(TelemetryEvent::FinalizerFailed {
                    id: resource.id,
                    kind: resource.kind,
                    message: err.message().to_string(),
                });
            }
            drop(guard);
        });
    }

    fn finish(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
            self.idle_async.notify_waiters();
        }
    }

    /// Blocks until no finalization is pending.
    pub(crate) fn reclaim(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.idle.wait(&mut pending);
        }
    }

    /// Suspends until no finalization is pending.
    pub(crate) async fn reclaim_async(&self) {
        loop {
            let idle = self.idle_async.notified();
            let drained = *self.pending.lock() == 0;
            if drained {
                return;
            }
            idle.await;
        }
    }

    pub(crate) fn stats(&self) -> FinalizerStats {
        FinalizerStats {
            pending: *self.pending.lock(),
            scheduled: self.scheduled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::memory::{BandSpec, DatasetSpec, Fault, MemoryEngine, MemoryFile};
    use crate::engine::{codes, NativeError};
    use crate::telemetry::RecordingTelemetrySink;
    use crate::Bridge;
    use std::sync::Arc;

    const PATH: &str = "/vsimem/sample.tif";

    fn engine() -> Arc<MemoryEngine> {
        Arc::new(MemoryEngine::new().with_file(
            PATH,
            MemoryFile::Dataset(DatasetSpec::raster("GTiff", 8, 8).with_band(BandSpec::new("Byte"))),
        ))
    }

    #[test]
    fn test_unreachable_handle_is_released() {
        let engine = engine();
        let bridge = Bridge::new(Arc::clone(&engine)).unwrap();

        let dataset = bridge.open(PATH).unwrap();
        let observer = dataset.downgrade();
        assert_eq!(engine.live_objects(), 1);

        drop(dataset);
        bridge.reclaim();

        assert!(!observer.is_reachable());
        assert!(!observer.is_valid());
        assert_eq!(engine.live_objects(), 0);

        let stats = bridge.stats().finalizer;
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_clones_keep_resource_alive() {
        let engine = engine();
        let bridge = Bridge::new(Arc::clone(&engine)).unwrap();

        let dataset = bridge.open(PATH).unwrap();
        let clone = dataset.clone();
        drop(dataset);
        bridge.reclaim();

        assert!(clone.is_valid());
        assert_eq!(bridge.stats().finalizer.scheduled, 0);
    }

    #[test]
    fn test_closed_handle_is_not_finalized() {
        let engine = engine();
        let bridge = Bridge::new(Arc::clone(&engine)).unwrap();

        let dataset = bridge.open(PATH).unwrap();
        dataset.close().unwrap();
        drop(dataset);
        bridge.reclaim();

        assert_eq!(bridge.stats().finalizer.scheduled, 0);
        assert_eq!(engine.release_count(), 1);
    }

    #[test]
    fn test_release_failure_is_reported_not_raised() {
        let engine = engine();
        let sink = Arc::new(RecordingTelemetrySink::new());
        let bridge = Bridge::builder(Arc::clone(&engine))
            .telemetry(sink.clone())
            .build()
            .unwrap();

        let dataset = bridge.open(PATH).unwrap();
        engine.inject_fault(
            "release",
            Fault::Error(NativeError::new(codes::APP_DEFINED, "release refused")),
        );
        drop(dataset);
        bridge.reclaim();

        assert_eq!(bridge.stats().finalizer.failed, 1);
        assert_eq!(sink.count("finalizer_failed"), 1);
        engine.clear_faults();
    }

    #[tokio::test]
    async fn test_reclaim_async() {
        let engine = engine();
        let bridge = Bridge::new(Arc::clone(&engine)).unwrap();

        for _ in 0..4 {
            let dataset = bridge.open_async(PATH).await.unwrap();
            drop(dataset);
        }
        bridge.reclaim_async().await;

        assert_eq!(engine.live_objects(), 0);
        assert_eq!(bridge.stats().finalizer.scheduled, 4);
    }
}
