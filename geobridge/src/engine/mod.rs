//! Native engine contract.
//!
//! The core never parses formats, reads bytes or runs geometry algorithms. It
//! reaches the native engine only through the [`NativeEngine`] trait, which
//! hands out opaque [`NativeDescriptor`]s and reports failures as
//! [`NativeError`]s carrying a native code and message.
//!
//! # Backends
//!
//! - [`memory::MemoryEngine`]: in-process engine with a virtual file table,
//!   per-version error text and an instrumented serialization probe
//! - `gdal::GdalEngine` (feature `gdal`): adapter over the `gdal` crate
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`. The core guarantees that calls whose
//! lock domains intersect never run concurrently, so backends need no
//! per-object locking beyond what their own bookkeeping requires.

pub mod codes;
pub mod memory;

#[cfg(feature = "gdal")]
pub mod gdal;

use std::fmt;
use thiserror::Error;

// =============================================================================
// Descriptors and errors
// =============================================================================

/// Opaque token for a native object, issued and interpreted by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeDescriptor(u64);

impl NativeDescriptor {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NativeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// An unclassified failure reported by the native engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("native error {code}: {message}")]
pub struct NativeError {
    pub code: i32,
    pub message: String,
}

impl NativeError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Result of a native call.
pub type NativeResult<T> = Result<T, NativeError>;

// =============================================================================
// Engine version
// =============================================================================

/// Version of the native engine, used to select error-text shim rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl EngineVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses either a dotted release string (`"3.8.4"`) or the packed numeric
    /// form reported by the engine (`"3080400"`).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.contains('.') {
            let mut parts = text.split('.').map(|p| p.trim().parse::<u32>());
            let major = parts.next()?.ok()?;
            let minor = parts.next().unwrap_or(Ok(0)).ok()?;
            let patch = parts.next().unwrap_or(Ok(0)).ok()?;
            return Some(Self::new(major, minor, patch));
        }
        let packed: u32 = text.parse().ok()?;
        Some(Self::new(
            packed / 1_000_000,
            (packed / 10_000) % 100,
            (packed / 100) % 100,
        ))
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// =============================================================================
// Value records
// =============================================================================

/// Dataset access mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessMode {
    #[default]
    ReadOnly,
    Update,
}

/// Options for opening a dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub access: AccessMode,
    /// Short driver names allowed to open the path. Empty means any driver.
    pub allowed_drivers: Vec<String>,
}

impl OpenOptions {
    pub fn update() -> Self {
        Self {
            access: AccessMode::Update,
            ..Self::default()
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.allowed_drivers.push(driver.into());
        self
    }
}

/// Raster dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterSize {
    pub width: usize,
    pub height: usize,
}

/// Raster band description.
#[derive(Clone, Debug, PartialEq)]
pub struct BandInfo {
    pub width: usize,
    pub height: usize,
    pub data_type: String,
    pub no_data: Option<f64>,
}

/// Vector layer description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
    pub feature_count: u64,
    pub geometry_type: String,
}

/// How a layer is looked up inside its dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerSelector {
    Index(usize),
    Name(String),
}

/// Scalar geometry measures computed by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryMeasure {
    Area,
    Length,
}

/// Virtual file system entry type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VsiEntryKind {
    File,
    Directory,
}

/// Result of a virtual file system stat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VsiStat {
    pub kind: VsiEntryKind,
    pub size: u64,
}

// =============================================================================
// Engine trait
// =============================================================================

/// The native geospatial data-access engine.
///
/// Every method is a single native call. Descriptors passed in are always
/// live: the core resolves them through the handle registry and never hands
/// a released descriptor back to the engine.
pub trait NativeEngine: Send + Sync + 'static {
    /// Version of the engine, consulted by the Version Shim.
    fn version(&self) -> EngineVersion;

    /// Short names of the registered format drivers.
    fn drivers(&self) -> NativeResult<Vec<String>>;

    /// Opens a dataset.
    fn open(&self, path: &str, options: &OpenOptions) -> NativeResult<NativeDescriptor>;

    /// Releases a native object. Called exactly once per descriptor.
    fn release(&self, descriptor: NativeDescriptor) -> NativeResult<()>;

    fn driver_name(&self, dataset: NativeDescriptor) -> NativeResult<String>;

    fn description(&self, dataset: NativeDescriptor) -> NativeResult<String>;

    fn raster_size(&self, dataset: NativeDescriptor) -> NativeResult<RasterSize>;

    fn raster_count(&self, dataset: NativeDescriptor) -> NativeResult<usize>;

    /// Returns a band by 1-based index.
    fn band(&self, dataset: NativeDescriptor, index: usize) -> NativeResult<NativeDescriptor>;

    fn band_info(&self, band: NativeDescriptor) -> NativeResult<BandInfo>;

    fn layer_count(&self, dataset: NativeDescriptor) -> NativeResult<usize>;

    fn layer(
        &self,
        dataset: NativeDescriptor,
        selector: &LayerSelector,
    ) -> NativeResult<NativeDescriptor>;

    fn layer_info(&self, layer: NativeDescriptor) -> NativeResult<LayerInfo>;

    /// Feature ids of a layer in iteration order.
    fn feature_ids(&self, layer: NativeDescriptor) -> NativeResult<Vec<u64>>;

    fn feature(&self, layer: NativeDescriptor, fid: u64) -> NativeResult<NativeDescriptor>;

    /// Returns an independently owned copy of a feature's geometry.
    fn feature_geometry(&self, feature: NativeDescriptor) -> NativeResult<NativeDescriptor>;

    fn geometry_from_wkt(&self, wkt: &str) -> NativeResult<NativeDescriptor>;

    fn geometry_wkt(&self, geometry: NativeDescriptor) -> NativeResult<String>;

    fn geometry_measure(
        &self,
        geometry: NativeDescriptor,
        measure: GeometryMeasure,
    ) -> NativeResult<f64>;

    fn geometry_is_valid(&self, geometry: NativeDescriptor) -> NativeResult<bool>;

    /// Returns a transformed copy of `geometry`.
    fn transform_geometry(
        &self,
        geometry: NativeDescriptor,
        transformation: NativeDescriptor,
    ) -> NativeResult<NativeDescriptor>;

    fn spatial_reference(&self, user_input: &str) -> NativeResult<NativeDescriptor>;

    fn srs_wkt(&self, srs: NativeDescriptor) -> NativeResult<String>;

    /// `AUTHORITY:CODE`, when the reference has one.
    fn srs_authority_code(&self, srs: NativeDescriptor) -> NativeResult<Option<String>>;

    fn coordinate_transformation(
        &self,
        source: NativeDescriptor,
        target: NativeDescriptor,
    ) -> NativeResult<NativeDescriptor>;

    /// Sets (or clears, with `None`) a process-wide configuration option.
    fn set_config_option(&self, key: &str, value: Option<&str>) -> NativeResult<()>;

    fn config_option(&self, key: &str) -> NativeResult<Option<String>>;

    fn stat(&self, path: &str) -> NativeResult<VsiStat>;

    /// Names of the direct children of a directory, sorted.
    fn read_dir(&self, path: &str) -> NativeResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_dotted() {
        assert_eq!(EngineVersion::parse("3.8.4"), Some(EngineVersion::new(3, 8, 4)));
        assert_eq!(EngineVersion::parse("2.4"), Some(EngineVersion::new(2, 4, 0)));
    }

    #[test]
    fn test_version_parse_packed() {
        assert_eq!(
            EngineVersion::parse("3080400"),
            Some(EngineVersion::new(3, 8, 4))
        );
        assert_eq!(
            EngineVersion::parse("2040100"),
            Some(EngineVersion::new(2, 4, 1))
        );
    }

    #[test]
    fn test_version_parse_garbage() {
        assert_eq!(EngineVersion::parse("three"), None);
        assert_eq!(EngineVersion::parse("3.x"), None);
    }

    #[test]
    fn test_version_ordering() {
        assert!(EngineVersion::new(2, 4, 1) < EngineVersion::new(3, 0, 0));
        assert_eq!(EngineVersion::new(3, 8, 4).to_string(), "3.8.4");
    }

    #[test]
    fn test_native_error_display() {
        let err = NativeError::new(codes::OPEN_FAILED, "x.tif: No such file or directory");
        assert_eq!(err.to_string(), "native error 4: x.tif: No such file or directory");
    }

    #[test]
    fn test_open_options_builder() {
        let options = OpenOptions::update().with_driver("GTiff");
        assert_eq!(options.access, AccessMode::Update);
        assert_eq!(options.allowed_drivers, vec!["GTiff".to_string()]);
    }
}
