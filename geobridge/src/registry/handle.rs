//! Managed owners of native resources.

use std::fmt;
use std::sync::{Arc, Weak};

use super::resource::{ResourceId, ResourceKind, ResourceRef};
use crate::dispatch::{self, close_operation, OperationContext, OperationFuture, PendingOperation};
use crate::engine::NativeDescriptor;
use crate::error::ErrorRecord;
use crate::finalizer::Finalizer;
use crate::outcome::Failure;
use crate::state::BridgeCore;
use crate::telemetry::CloseOrigin;

struct HandleInner {
    resource: ResourceRef,
    core: Arc<BridgeCore>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        // Unreachable but still open: release it without blocking this thread.
        if self.core.registry.contains(&self.resource) {
            Finalizer::schedule(&self.core, self.resource);
        }
    }
}

/// The exclusive owner of one resource's native descriptor.
///
/// Clones share ownership. The resource is released by [`Handle::close`], or
/// by the finalizer once the last clone is dropped.
#[derive(Clone)]
pub struct Handle {
    inner: Arc<HandleInner>,
}

impl Handle {
    pub(crate) fn new(core: Arc<BridgeCore>, resource: ResourceRef) -> Self {
        Self {
            inner: Arc::new(HandleInner { resource, core }),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.inner.resource.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.inner.resource.kind
    }

    pub fn resource(&self) -> ResourceRef {
        self.inner.resource
    }

    /// Returns true if neither the resource nor any ancestor has been closed.
    pub fn is_valid(&self) -> bool {
        self.inner.core.registry.is_valid(&self.inner.resource)
    }

    /// Releases the resource now. Closing twice is not an error.
    ///
    /// Waits for every operation already queued on the resource's domains.
    pub fn close(&self) -> Result<(), ErrorRecord> {
        dispatch::call_sync(
            &self.inner.core,
            close_operation(self.inner.resource, CloseOrigin::Explicit),
        )
    }

    pub fn close_async(&self) -> OperationFuture<()> {
        dispatch::call_async(
            &self.inner.core,
            close_operation(self.inner.resource, CloseOrigin::Explicit),
        )
    }

    /// Returns an observer that does not keep the resource alive.
    pub fn downgrade(&self) -> ResourceObserver {
        ResourceObserver {
            resource: self.inner.resource,
            handle: Arc::downgrade(&self.inner),
            core: Arc::downgrade(&self.inner.core),
        }
    }

    pub(crate) fn core(&self) -> &Arc<BridgeCore> {
        &self.inner.core
    }

    /// Fails with `InvalidArgument` if `other` belongs to a different bridge.
    pub(crate) fn ensure_same_bridge(&self, other: &Handle) -> Result<(), ErrorRecord> {
        if self.inner.core.id == other.inner.core.id {
            Ok(())
        } else {
            Err(ErrorRecord::invalid_argument(format!(
                "{} belongs to a different bridge than {}",
                other.kind(),
                self.kind()
            )))
        }
    }

    /// Builds an operation on this resource that resolves its descriptor
    /// first, so a closed resource never reaches the engine.
    pub(crate) fn operation<T, F>(&self, name: &'static str, call: F) -> PendingOperation<T>
    where
        F: FnOnce(&OperationContext<'_>, NativeDescriptor) -> Result<T, Failure> + Send + 'static,
    {
        let resource = self.inner.resource;
        PendingOperation::on(name, &[&resource], move |ctx| {
            let descriptor = ctx.resolve(&resource)?;
            call(ctx, descriptor)
        })
    }

    /// Runs an operation on the calling thread.
    pub(crate) fn call_sync<T>(&self, op: PendingOperation<T>) -> Result<T, ErrorRecord> {
        dispatch::call_sync(&self.inner.core, op)
    }

    /// Runs an operation on the worker pool.
    pub(crate) fn call_async<T>(&self, op: PendingOperation<T>) -> OperationFuture<T>
    where
        T: Send + 'static,
    {
        dispatch::call_async(&self.inner.core, op)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("resource", &self.inner.resource)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Observes a resource without owning it.
#[derive(Clone, Debug)]
pub struct ResourceObserver {
    resource: ResourceRef,
    handle: Weak<HandleInner>,
    core: Weak<BridgeCore>,
}

impl ResourceObserver {
    pub fn id(&self) -> ResourceId {
        self.resource.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.kind
    }

    /// Returns true while some handle to the resource is still alive.
    pub fn is_reachable(&self) -> bool {
        self.handle.strong_count() > 0
    }

    /// Returns true while the resource is open and usable.
    pub fn is_valid(&self) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| core.registry.is_valid(&self.resource))
    }

    /// Recovers a handle if one is still alive.
    pub fn upgrade(&self) -> Option<Handle> {
        self.handle.upgrade().map(|inner| Handle { inner })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::memory::{DatasetSpec, LayerSpec, MemoryEngine, MemoryFile};
    use crate::error::ErrorKind;
    use crate::{Bridge, ResourceKind};
    use std::sync::Arc;

    const PATH: &str = "/vsimem/roads.geojson";

    fn bridge() -> Bridge {
        let engine = MemoryEngine::new().with_file(
            PATH,
            MemoryFile::Dataset(
                DatasetSpec::vector("GeoJSON")
                    .with_layer(LayerSpec::new("roads", "LineString").with_feature(1, "LINESTRING (0 0,1 1)")),
            ),
        );
        Bridge::new(Arc::new(engine)).unwrap()
    }

    #[test]
    fn test_handle_identity() {
        let bridge = bridge();
        let dataset = bridge.open(PATH).unwrap();
        let handle = dataset.handle();

        assert_eq!(handle.kind(), ResourceKind::Dataset);
        assert_eq!(handle.id(), dataset.id());
        assert!(handle.resource().is_root());
        assert!(format!("{:?}", handle).contains("valid: true"));
    }

    #[test]
    fn test_close_twice_is_ok() {
        let bridge = bridge();
        let dataset = bridge.open(PATH).unwrap();

        dataset.close().unwrap();
        dataset.close().unwrap();
        assert!(!dataset.is_valid());
    }

    #[test]
    fn test_observer_upgrade() {
        let bridge = bridge();
        let dataset = bridge.open(PATH).unwrap();
        let observer = dataset.downgrade();

        let upgraded = observer.upgrade().expect("handle still alive");
        assert_eq!(upgraded.id(), dataset.id());
        assert!(observer.is_valid());

        drop(upgraded);
        drop(dataset);
        bridge.reclaim();

        assert!(observer.upgrade().is_none());
        assert!(!observer.is_valid());
    }

    #[test]
    fn test_cross_bridge_handles_are_rejected() {
        let first = bridge();
        let second = bridge();
        let a = first.open(PATH).unwrap();
        let b = second.open(PATH).unwrap();

        assert!(a.handle().ensure_same_bridge(a.handle()).is_ok());
        let err = a.handle().ensure_same_bridge(b.handle()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_close_async() {
        let bridge = bridge();
        let dataset = bridge.open(PATH).unwrap();
        let layer = dataset.layer(0).unwrap();

        dataset.close_async().await.unwrap();

        let err = layer.info().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceClosed);
    }
}
