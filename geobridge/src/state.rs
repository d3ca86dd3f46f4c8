//! State shared by a bridge and every handle it created.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dispatch::PoolHandle;
use crate::domain::LockDomainManager;
use crate::engine::{EngineVersion, NativeEngine};
use crate::finalizer::Finalizer;
use crate::outcome::VersionShim;
use crate::registry::HandleRegistry;
use crate::telemetry::TelemetrySink;

static NEXT_BRIDGE_ID: AtomicU64 = AtomicU64::new(1);

/// Handles keep this alive, never the pool runtime itself; the runtime is
/// owned by the [`Bridge`](crate::Bridge) alone.
pub(crate) struct BridgeCore {
    pub(crate) id: u64,
    pub(crate) engine: Arc<dyn NativeEngine>,
    pub(crate) version: EngineVersion,
    pub(crate) registry: HandleRegistry,
    pub(crate) domains: LockDomainManager,
    pub(crate) shim: VersionShim,
    pub(crate) finalizer: Finalizer,
    pub(crate) telemetry: Arc<dyn TelemetrySink>,
    pub(crate) pool: PoolHandle,
}

impl BridgeCore {
    pub(crate) fn new(
        engine: Arc<dyn NativeEngine>,
        shim: VersionShim,
        telemetry: Arc<dyn TelemetrySink>,
        pool: PoolHandle,
    ) -> Self {
        let version = engine.version();
        Self {
            id: NEXT_BRIDGE_ID.fetch_add(1, Ordering::Relaxed),
            engine,
            version,
            registry: HandleRegistry::new(),
            domains: LockDomainManager::new(),
            shim,
            finalizer: Finalizer::new(),
            telemetry,
            pool,
        }
    }
}

impl fmt::Debug for BridgeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeCore")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("open_resources", &self.registry.open_count())
            .finish_non_exhaustive()
    }
}
