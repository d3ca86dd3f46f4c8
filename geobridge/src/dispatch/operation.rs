//! Pending operations and the context they run in.

use std::fmt;
use std::sync::Arc;

use crate::domain::LockScope;
use crate::engine::{NativeDescriptor, NativeEngine};
use crate::outcome::Failure;
use crate::registry::{CloseOutcome, Handle, ResourceKind, ResourceRef};
use crate::state::BridgeCore;
use crate::telemetry::{CloseOrigin, TelemetryEvent};

type OperationFn<T> = Box<dyn FnOnce(&OperationContext<'_>) -> Result<T, Failure> + Send>;

/// A unit of work: the domains it needs and the native call to make.
///
/// Built once and handed to either call style unchanged.
pub(crate) struct PendingOperation<T> {
    name: &'static str,
    scope: LockScope,
    call: OperationFn<T>,
}

impl<T> PendingOperation<T> {
    pub(crate) fn new<F>(name: &'static str, scope: LockScope, call: F) -> Self
    where
        F: FnOnce(&OperationContext<'_>) -> Result<T, Failure> + Send + 'static,
    {
        Self {
            name,
            scope,
            call: Box::new(call),
        }
    }

    /// An operation on the given resources.
    pub(crate) fn on<F>(name: &'static str, resources: &[&ResourceRef], call: F) -> Self
    where
        F: FnOnce(&OperationContext<'_>) -> Result<T, Failure> + Send + 'static,
    {
        Self::new(name, LockScope::for_resources(resources), call)
    }

    /// A process-wide read.
    pub(crate) fn global<F>(name: &'static str, call: F) -> Self
    where
        F: FnOnce(&OperationContext<'_>) -> Result<T, Failure> + Send + 'static,
    {
        Self::new(name, LockScope::global_shared(), call)
    }

    /// A process-wide mutation.
    pub(crate) fn global_exclusive<F>(name: &'static str, call: F) -> Self
    where
        F: FnOnce(&OperationContext<'_>) -> Result<T, Failure> + Send + 'static,
    {
        Self::new(name, LockScope::global_exclusive(), call)
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn scope(&self) -> &LockScope {
        &self.scope
    }

    pub(crate) fn run(self, ctx: &OperationContext<'_>) -> Result<T, Failure> {
        (self.call)(ctx)
    }
}

impl<T> fmt::Debug for PendingOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// What an operation may touch while its domains are held.
pub(crate) struct OperationContext<'a> {
    core: &'a Arc<BridgeCore>,
}

impl<'a> OperationContext<'a> {
    pub(crate) fn new(core: &'a Arc<BridgeCore>) -> Self {
        Self { core }
    }

    pub(crate) fn engine(&self) -> &dyn NativeEngine {
        self.core.engine.as_ref()
    }

    /// Descriptor of an open resource, or `ResourceClosed`.
    pub(crate) fn resolve(&self, resource: &ResourceRef) -> Result<NativeDescriptor, Failure> {
        Ok(self.core.registry.resolve(resource)?)
    }

    /// Registers a new native object and binds it to a handle.
    pub(crate) fn register(
        &self,
        kind: ResourceKind,
        descriptor: NativeDescriptor,
        parent: Option<&ResourceRef>,
    ) -> Handle {
        let resource = self.core.registry.register(kind, descriptor, parent);
        self.core.telemetry.emit(TelemetryEvent::ResourceRegistered {
            id: resource.id,
            kind,
            parent: parent.map(|p| p.id),
        });
        Handle::new(Arc::clone(self.core), resource)
    }

    /// Closes a resource and releases its descriptor. Idempotent.
    pub(crate) fn close(&self, resource: &ResourceRef, origin: CloseOrigin) -> Result<(), Failure> {
        let release = match self.core.registry.close(resource) {
            CloseOutcome::AlreadyClosed => return Ok(()),
            CloseOutcome::Closed { release } => release,
        };

        self.core.telemetry.emit(TelemetryEvent::ResourceClosed {
            id: resource.id,
            kind: resource.kind,
            origin,
            released: release.is_some(),
        });

        if let Some(descriptor) = release {
            self.engine().release(descriptor)?;
        }
        Ok(())
    }

    pub(crate) fn emit(&self, event: TelemetryEvent) {
        self.core.telemetry.emit(event);
    }
}

/// The close of one resource, under that resource's domains.
pub(crate) fn close_operation(resource: ResourceRef, origin: CloseOrigin) -> PendingOperation<()> {
    PendingOperation::on("close", &[&resource], move |ctx| {
        ctx.close(&resource, origin)
    })
}
