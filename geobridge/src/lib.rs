//! GeoBridge - lifetime-safe access to a native geospatial engine
//!
//! This library wraps a native, non-memory-managed geospatial data-access
//! engine so that its objects (datasets, layers, bands, features, geometries,
//! spatial references, coordinate transformations) can be used from blocking
//! and non-blocking code without ever touching a released native object, and
//! without two related native calls ever running at once.
//!
//! # High-Level API
//!
//! ```
//! use std::sync::Arc;
//! use geobridge::engine::memory::{DatasetSpec, LayerSpec, MemoryEngine, MemoryFile};
//! use geobridge::{Bridge, ErrorKind};
//!
//! let engine = MemoryEngine::new().with_file(
//!     "/vsimem/roads.geojson",
//!     MemoryFile::Dataset(
//!         DatasetSpec::vector("GeoJSON")
//!             .with_layer(LayerSpec::new("roads", "LineString").with_feature(1, "LINESTRING (0 0,3 4)")),
//!     ),
//! );
//! let bridge = Bridge::new(Arc::new(engine)).unwrap();
//!
//! let dataset = bridge.open("/vsimem/roads.geojson").unwrap();
//! let layer = dataset.layer(0).unwrap();
//! let geometry = layer.feature(1).unwrap().geometry().unwrap();
//!
//! dataset.close().unwrap();
//! assert_eq!(layer.info().unwrap_err().kind(), ErrorKind::ResourceClosed);
//! // The geometry is an independent copy.
//! assert_eq!(geometry.length().unwrap(), 5.0);
//! ```
//!
//! # Components
//!
//! - [`registry`]: handles, resource ids and parent links
//! - [`domain`]: lock domains serializing related native calls
//! - [`dispatch`]: one execution path behind the blocking and `_async` APIs
//! - [`outcome`]: classification of native failures into [`ErrorRecord`]s
//! - [`telemetry`]: lifecycle and error trace events
//! - [`engine`]: the native engine contract and its backends

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod registry;
pub mod resources;
pub mod telemetry;

mod finalizer;
mod state;

pub use bridge::{Bridge, BridgeBuilder, BridgeError, BridgeStats};
pub use dispatch::OperationFuture;
pub use error::{ErrorKind, ErrorRecord};
pub use finalizer::FinalizerStats;
pub use registry::{Handle, ResourceId, ResourceKind, ResourceObserver};
pub use resources::{
    CoordinateTransformation, Dataset, Feature, Geometry, Layer, RasterBand, SpatialReference,
};

/// Version of the GeoBridge library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
