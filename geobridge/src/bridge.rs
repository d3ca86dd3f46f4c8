//! The bridge facade.
//!
//! A [`Bridge`] binds one native engine to a worker pool, a handle registry, a
//! lock domain manager and a finalizer. Every resource is created through it
//! and every call on a resource is routed through the same machinery.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use geobridge::engine::memory::{BandSpec, DatasetSpec, MemoryEngine, MemoryFile};
//! use geobridge::Bridge;
//!
//! let engine = MemoryEngine::new().with_file(
//!     "/vsimem/sample.tif",
//!     MemoryFile::Dataset(DatasetSpec::raster("GTiff", 4, 3).with_band(BandSpec::new("Byte"))),
//! );
//! let bridge = Bridge::builder(Arc::new(engine)).workers(2).build().unwrap();
//!
//! let dataset = bridge.open("/vsimem/sample.tif").unwrap();
//! assert_eq!(dataset.raster_size().unwrap().width, 4);
//! dataset.close().unwrap();
//! ```
//!
//! # Shutdown
//!
//! Dropping the bridge waits for every submitted operation, drains pending
//! finalizations, closes every resource still open and finally stops the
//! worker pool. Handles that outlive the bridge report `ResourceClosed` from
//! both the blocking and the `_async` forms.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{BridgeConfig, ConfigFile, ConfigFileError};
use crate::dispatch::{
    self, close_operation, OperationFuture, PendingOperation, PoolStats, WorkerPool,
};
use crate::domain::{DomainStats, LockScope};
use crate::engine::{EngineVersion, NativeEngine, OpenOptions, VsiStat};
use crate::error::ErrorRecord;
use crate::finalizer::FinalizerStats;
use crate::outcome::{ShimRule, VersionShim};
use crate::registry::{Handle, ResourceKind};
use crate::resources::{CoordinateTransformation, Dataset, Geometry, SpatialReference};
use crate::state::BridgeCore;
use crate::telemetry::{CloseOrigin, NullTelemetrySink, TelemetryEvent, TelemetrySink};

/// Errors raised while building a bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The worker pool runtime could not be started
    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] std::io::Error),

    /// The configuration file could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigFileError),

    /// A configured engine option was rejected
    #[error("Failed to apply engine option {key}: {source}")]
    EngineOption {
        key: String,
        #[source]
        source: ErrorRecord,
    },
}

/// Point-in-time bridge statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub pool: PoolStats,
    pub open_resources: usize,
    pub finalizer: FinalizerStats,
    pub domains: DomainStats,
}

// =============================================================================
// Builder
// =============================================================================

/// Builds a [`Bridge`].
pub struct BridgeBuilder {
    engine: Arc<dyn NativeEngine>,
    config: BridgeConfig,
    telemetry: Arc<dyn TelemetrySink>,
    shim: VersionShim,
}

impl BridgeBuilder {
    pub fn new<E: NativeEngine>(engine: Arc<E>) -> Self {
        Self {
            engine,
            config: BridgeConfig::default(),
            telemetry: Arc::new(NullTelemetrySink),
            shim: VersionShim::default(),
        }
    }

    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads configuration from an INI file. A missing file yields defaults.
    pub fn config_file(mut self, path: &Path) -> Result<Self, BridgeError> {
        let file = ConfigFile::load_from(path)?;
        self.config = BridgeConfig::from(&file);
        Ok(self)
    }

    /// Sets the worker pool size, clamped to the configured limits.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config = self.config.with_workers(workers);
        self
    }

    pub fn engine_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.with_engine_option(key, value);
        self
    }

    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = sink;
        self
    }

    /// Adds a classification rule that takes precedence over the defaults.
    pub fn shim_rule(mut self, rule: ShimRule) -> Self {
        self.shim = self.shim.with_rule(rule);
        self
    }

    /// Starts the worker pool and applies configured engine options.
    pub fn build(self) -> Result<Bridge, BridgeError> {
        let pool = WorkerPool::new(self.config.workers, self.config.scheduler_threads)?;
        let core = Arc::new(BridgeCore::new(
            self.engine,
            self.shim,
            self.telemetry,
            pool.handle().clone(),
        ));
        let bridge = Bridge { core, pool };

        for (key, value) in &self.config.engine_options {
            bridge
                .set_config_option(key, Some(value))
                .map_err(|source| BridgeError::EngineOption {
                    key: key.clone(),
                    source,
                })?;
        }

        tracing::info!(
            engine_version = %bridge.core.version,
            workers = self.config.workers,
            engine_options = self.config.engine_options.len(),
            "Bridge started"
        );
        Ok(bridge)
    }
}

// =============================================================================
// Bridge
// =============================================================================

/// Entry point for every native resource.
pub struct Bridge {
    core: Arc<BridgeCore>,
    pool: WorkerPool,
}

impl Bridge {
    pub fn builder<E: NativeEngine>(engine: Arc<E>) -> BridgeBuilder {
        BridgeBuilder::new(engine)
    }

    /// Builds a bridge with default configuration.
    pub fn new<E: NativeEngine>(engine: Arc<E>) -> Result<Self, BridgeError> {
        BridgeBuilder::new(engine).build()
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    fn open_op(path: &str, options: OpenOptions) -> PendingOperation<Dataset> {
        let path = path.to_string();
        PendingOperation::global("bridge.open", move |ctx| {
            let descriptor = ctx.engine().open(&path, &options)?;
            let handle = ctx.register(ResourceKind::Dataset, descriptor, None);
            tracing::debug!(path = %path, resource = %handle.resource(), "Dataset opened");
            Ok(Dataset::from_handle(handle))
        })
    }

    fn geometry_from_wkt_op(wkt: &str) -> PendingOperation<Geometry> {
        let wkt = wkt.to_string();
        PendingOperation::global("bridge.geometry_from_wkt", move |ctx| {
            let descriptor = ctx.engine().geometry_from_wkt(&wkt)?;
            let handle = ctx.register(ResourceKind::Geometry, descriptor, None);
            Ok(Geometry::from_handle(handle))
        })
    }

    fn spatial_reference_op(user_input: &str) -> PendingOperation<SpatialReference> {
        let user_input = user_input.to_string();
        PendingOperation::global("bridge.spatial_reference", move |ctx| {
            let descriptor = ctx.engine().spatial_reference(&user_input)?;
            let handle = ctx.register(ResourceKind::SpatialReference, descriptor, None);
            Ok(SpatialReference::from_handle(handle))
        })
    }

    fn coordinate_transformation_op(
        &self,
        source: &SpatialReference,
        target: &SpatialReference,
    ) -> Result<PendingOperation<CoordinateTransformation>, ErrorRecord> {
        self.ensure_owned(source.handle())?;
        self.ensure_owned(target.handle())?;
        let source = source.handle().resource();
        let target = target.handle().resource();
        Ok(PendingOperation::on(
            "bridge.coordinate_transformation",
            &[&source, &target],
            move |ctx| {
                let from = ctx.resolve(&source)?;
                let to = ctx.resolve(&target)?;
                let descriptor = ctx.engine().coordinate_transformation(from, to)?;
                let handle =
                    ctx.register(ResourceKind::CoordinateTransformation, descriptor, None);
                Ok(CoordinateTransformation::from_handle(
                    handle, source.id, target.id,
                ))
            },
        ))
    }

    fn set_config_option_op(key: &str, value: Option<&str>) -> PendingOperation<()> {
        let key = key.to_string();
        let value = value.map(str::to_string);
        PendingOperation::global_exclusive("bridge.set_config_option", move |ctx| {
            ctx.engine().set_config_option(&key, value.as_deref())?;
            ctx.emit(TelemetryEvent::ConfigOptionChanged { key, value });
            Ok(())
        })
    }

    fn config_option_op(key: &str) -> PendingOperation<Option<String>> {
        let key = key.to_string();
        PendingOperation::global("bridge.config_option", move |ctx| {
            Ok(ctx.engine().config_option(&key)?)
        })
    }

    fn drivers_op() -> PendingOperation<Vec<String>> {
        PendingOperation::global("bridge.drivers", |ctx| Ok(ctx.engine().drivers()?))
    }

    fn stat_op(path: &str) -> PendingOperation<VsiStat> {
        let path = path.to_string();
        PendingOperation::global("bridge.stat", move |ctx| Ok(ctx.engine().stat(&path)?))
    }

    fn read_dir_op(path: &str) -> PendingOperation<Vec<String>> {
        let path = path.to_string();
        PendingOperation::global("bridge.read_dir", move |ctx| {
            Ok(ctx.engine().read_dir(&path)?)
        })
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Arc<BridgeCore> {
        &self.core
    }

    fn ensure_owned(&self, handle: &Handle) -> Result<(), ErrorRecord> {
        if handle.core().id == self.core.id {
            Ok(())
        } else {
            Err(ErrorRecord::invalid_argument(format!(
                "{} belongs to a different bridge",
                handle.kind()
            )))
        }
    }

    fn call_sync<T>(&self, op: PendingOperation<T>) -> Result<T, ErrorRecord> {
        dispatch::call_sync(&self.core, op)
    }

    fn call_async<T: Send + 'static>(&self, op: PendingOperation<T>) -> OperationFuture<T> {
        dispatch::call_async(&self.core, op)
    }

    // -------------------------------------------------------------------------
    // Datasets
    // -------------------------------------------------------------------------

    /// Opens a dataset read-only with any driver.
    ///
    /// Opening the same path twice yields two independent datasets.
    pub fn open(&self, path: &str) -> Result<Dataset, ErrorRecord> {
        self.call_sync(Self::open_op(path, OpenOptions::default()))
    }

    pub fn open_async(&self, path: &str) -> OperationFuture<Dataset> {
        self.call_async(Self::open_op(path, OpenOptions::default()))
    }

    pub fn open_with(&self, path: &str, options: OpenOptions) -> Result<Dataset, ErrorRecord> {
        self.call_sync(Self::open_op(path, options))
    }

    pub fn open_with_async(&self, path: &str, options: OpenOptions) -> OperationFuture<Dataset> {
        self.call_async(Self::open_op(path, options))
    }

    // -------------------------------------------------------------------------
    // Geometry and spatial references
    // -------------------------------------------------------------------------

    pub fn geometry_from_wkt(&self, wkt: &str) -> Result<Geometry, ErrorRecord> {
        self.call_sync(Self::geometry_from_wkt_op(wkt))
    }

    pub fn geometry_from_wkt_async(&self, wkt: &str) -> OperationFuture<Geometry> {
        self.call_async(Self::geometry_from_wkt_op(wkt))
    }

    /// Builds a spatial reference from user input such as `EPSG:4326` or WKT.
    pub fn spatial_reference(&self, user_input: &str) -> Result<SpatialReference, ErrorRecord> {
        self.call_sync(Self::spatial_reference_op(user_input))
    }

    pub fn spatial_reference_async(&self, user_input: &str) -> OperationFuture<SpatialReference> {
        self.call_async(Self::spatial_reference_op(user_input))
    }

    pub fn coordinate_transformation(
        &self,
        source: &SpatialReference,
        target: &SpatialReference,
    ) -> Result<CoordinateTransformation, ErrorRecord> {
        let op = self.coordinate_transformation_op(source, target)?;
        self.call_sync(op)
    }

    pub fn coordinate_transformation_async(
        &self,
        source: &SpatialReference,
        target: &SpatialReference,
    ) -> OperationFuture<CoordinateTransformation> {
        match self.coordinate_transformation_op(source, target) {
            Ok(op) => self.call_async(op),
            Err(err) => OperationFuture::ready(Err(err)),
        }
    }

    // -------------------------------------------------------------------------
    // Process-wide configuration
    // -------------------------------------------------------------------------

    /// Sets or clears a native configuration option.
    ///
    /// Runs alone: it waits for every earlier operation and holds back every
    /// later one until it completes.
    pub fn set_config_option(&self, key: &str, value: Option<&str>) -> Result<(), ErrorRecord> {
        self.call_sync(Self::set_config_option_op(key, value))
    }

    pub fn set_config_option_async(&self, key: &str, value: Option<&str>) -> OperationFuture<()> {
        self.call_async(Self::set_config_option_op(key, value))
    }

    pub fn config_option(&self, key: &str) -> Result<Option<String>, ErrorRecord> {
        self.call_sync(Self::config_option_op(key))
    }

    pub fn config_option_async(&self, key: &str) -> OperationFuture<Option<String>> {
        self.call_async(Self::config_option_op(key))
    }

    /// Short names of the registered drivers.
    pub fn drivers(&self) -> Result<Vec<String>, ErrorRecord> {
        self.call_sync(Self::drivers_op())
    }

    pub fn drivers_async(&self) -> OperationFuture<Vec<String>> {
        self.call_async(Self::drivers_op())
    }

    // -------------------------------------------------------------------------
    // Virtual file system
    // -------------------------------------------------------------------------

    pub fn stat(&self, path: &str) -> Result<VsiStat, ErrorRecord> {
        self.call_sync(Self::stat_op(path))
    }

    pub fn stat_async(&self, path: &str) -> OperationFuture<VsiStat> {
        self.call_async(Self::stat_op(path))
    }

    /// Names of the direct children of a directory, sorted.
    pub fn read_dir(&self, path: &str) -> Result<Vec<String>, ErrorRecord> {
        self.call_sync(Self::read_dir_op(path))
    }

    pub fn read_dir_async(&self, path: &str) -> OperationFuture<Vec<String>> {
        self.call_async(Self::read_dir_op(path))
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    pub fn engine_version(&self) -> EngineVersion {
        self.core.version
    }

    /// Blocks until every finalization scheduled so far has completed.
    ///
    /// Drop the last handle to a resource, call this, and the resource is
    /// released.
    pub fn reclaim(&self) {
        self.core.finalizer.reclaim();
    }

    pub async fn reclaim_async(&self) {
        self.core.finalizer.reclaim_async().await;
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            pool: self.pool.handle().stats(),
            open_resources: self.core.registry.open_count(),
            finalizer: self.core.finalizer.stats(),
            domains: self.core.domains.stats(),
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge").field("core", &self.core).finish()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        // Everything submitted so far runs before this ticket is granted.
        let mut barrier = self.core.domains.acquire(&LockScope::global_exclusive());
        barrier.wait_blocking();
        drop(barrier);

        self.core.finalizer.reclaim();

        let open = self.core.registry.snapshot();
        let count = open.len();
        for resource in open {
            if let Err(err) =
                dispatch::call_sync(&self.core, close_operation(resource, CloseOrigin::Shutdown))
            {
                tracing::warn!(
                    resource = %resource,
                    error = %err,
                    "Failed to release resource at shutdown"
                );
            }
        }

        tracing::info!(closed = count, "Bridge shut down");
        // The pool shuts down when `self.pool` drops after this.
    }
}
