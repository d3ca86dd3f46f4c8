//! In-process reference engine.
//!
//! [`MemoryEngine`] implements [`NativeEngine`] over a virtual file table held
//! in memory. It exists so the core can be exercised end to end without a
//! native library:
//!
//! - files are registered up front as [`MemoryFile`]s; paths under
//!   `/vsicurl/` and `/vsis3/` fail like their network backends when missing
//! - error codes and messages follow the engine version it is built for, so
//!   the Version Shim sees realistic text
//! - failures, panics and latency can be injected per operation
//! - a [`SerializationProbe`] counts calls that overlap on the same native
//!   state, and release counters expose double or invalid releases
//!
//! # Example
//!
//! ```
//! use geobridge::engine::memory::{BandSpec, DatasetSpec, MemoryEngine, MemoryFile};
//!
//! let engine = MemoryEngine::new().with_file(
//!     "sample.tif",
//!     MemoryFile::Dataset(DatasetSpec::raster("GTiff", 984, 804).with_band(BandSpec::new("Byte"))),
//! );
//! assert_eq!(engine.live_objects(), 0);
//! ```

mod probe;
mod vfs;
pub mod geometry;

pub use probe::{Family, ProbeReport, SerializationProbe};
pub use vfs::{
    missing_path_error, normalize_path, unrecognized_format_error, BandSpec, DatasetSpec,
    FeatureSpec, LayerSpec, MemoryFile, VSICURL_PREFIX, VSIS3_PREFIX,
};

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;

use super::{
    codes, AccessMode, BandInfo, EngineVersion, GeometryMeasure, LayerInfo, LayerSelector,
    NativeDescriptor, NativeEngine, NativeError, NativeResult, OpenOptions, RasterSize, VsiEntryKind,
    VsiStat,
};
use geometry::Geometry;

/// Version reported by [`MemoryEngine::new`].
pub const DEFAULT_ENGINE_VERSION: EngineVersion = EngineVersion::new(3, 8, 4);

/// Drivers registered by [`MemoryEngine::new`].
pub const DEFAULT_DRIVERS: &[&str] = &["GTiff", "GeoJSON", "ESRI Shapefile", "MEM"];

const EPSG_WGS84: u32 = 4326;
const EPSG_WEB_MERCATOR: u32 = 3857;

/// An injected failure.
#[derive(Clone, Debug, PartialEq)]
pub enum Fault {
    /// The call returns this native error.
    Error(NativeError),
    /// The call unwinds with this message.
    Panic(String),
}

#[derive(Debug)]
enum Object {
    Dataset {
        path: String,
        spec: Arc<DatasetSpec>,
    },
    Band {
        dataset: u64,
        spec: Arc<DatasetSpec>,
        index: usize,
    },
    Layer {
        dataset: u64,
        spec: Arc<DatasetSpec>,
        index: usize,
    },
    Feature {
        dataset: u64,
        fid: u64,
        wkt: String,
    },
    Geometry(Geometry),
    SpatialReference(u32),
    Transformation {
        source: u32,
        target: u32,
    },
}

impl Object {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Dataset { .. } => "Dataset",
            Self::Band { .. } => "RasterBand",
            Self::Layer { .. } => "Layer",
            Self::Feature { .. } => "Feature",
            Self::Geometry(_) => "Geometry",
            Self::SpatialReference(_) => "SpatialReference",
            Self::Transformation { .. } => "CoordinateTransformation",
        }
    }

    /// The dataset whose state this object shares, if any.
    fn dataset(&self) -> Option<u64> {
        match self {
            Self::Band { dataset, .. }
            | Self::Layer { dataset, .. }
            | Self::Feature { dataset, .. } => Some(*dataset),
            _ => None,
        }
    }
}

/// In-memory [`NativeEngine`].
pub struct MemoryEngine {
    version: EngineVersion,
    drivers: Vec<String>,
    files: DashMap<String, MemoryFile>,
    objects: DashMap<u64, Object>,
    next_descriptor: AtomicU64,
    config: RwLock<HashMap<String, String>>,
    faults: DashMap<String, Fault>,
    latency_us: AtomicU64,
    probe: SerializationProbe,
    releases: AtomicU64,
    invalid_releases: AtomicU64,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            version: DEFAULT_ENGINE_VERSION,
            drivers: DEFAULT_DRIVERS.iter().map(|d| d.to_string()).collect(),
            files: DashMap::new(),
            objects: DashMap::new(),
            next_descriptor: AtomicU64::new(1),
            config: RwLock::new(HashMap::new()),
            faults: DashMap::new(),
            latency_us: AtomicU64::new(0),
            probe: SerializationProbe::new(),
            releases: AtomicU64::new(0),
            invalid_releases: AtomicU64::new(0),
        }
    }

    /// Reports `version` and words its errors like that release.
    pub fn with_version(mut self, version: EngineVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_drivers<I, S>(mut self, drivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drivers = drivers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_file(self, path: &str, file: MemoryFile) -> Self {
        self.add_file(path, file);
        self
    }

    pub fn add_file(&self, path: &str, file: MemoryFile) {
        self.files.insert(normalize_path(path), file);
    }

    pub fn remove_file(&self, path: &str) -> bool {
        self.files.remove(&normalize_path(path)).is_some()
    }

    /// Makes every later call to `operation` fail with `fault`.
    pub fn inject_fault(&self, operation: &str, fault: Fault) {
        self.faults.insert(operation.to_string(), fault);
    }

    pub fn clear_faults(&self) {
        self.faults.clear();
    }

    /// Sleeps this long inside every call, widening overlap windows.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_us
            .store(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn probe_report(&self) -> ProbeReport {
        self.probe.report()
    }

    /// Native objects currently allocated.
    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    /// Successful releases so far.
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    /// Releases of descriptors that were never issued or already released.
    pub fn invalid_release_count(&self) -> u64 {
        self.invalid_releases.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn call<R>(
        &self,
        operation: &str,
        family: Family,
        body: impl FnOnce() -> NativeResult<R>,
    ) -> NativeResult<R> {
        let _probe = self.probe.enter(family);

        let fault = self.faults.get(operation).map(|f| f.value().clone());
        match fault {
            Some(Fault::Error(err)) => return Err(err),
            Some(Fault::Panic(message)) => panic!("{message}"),
            None => {}
        }

        let latency = self.latency_us.load(Ordering::Relaxed);
        if latency > 0 {
            thread::sleep(Duration::from_micros(latency));
        }
        body()
    }

    fn insert(&self, object: Object) -> NativeDescriptor {
        let raw = self.next_descriptor.fetch_add(1, Ordering::Relaxed);
        self.objects.insert(raw, object);
        NativeDescriptor::new(raw)
    }

    /// Looks an object up and extracts what the caller needs from it.
    fn inspect<R>(
        &self,
        descriptor: NativeDescriptor,
        expected: &str,
        extract: impl FnOnce(&Object) -> Option<R>,
    ) -> NativeResult<R> {
        let object = self
            .objects
            .get(&descriptor.raw())
            .ok_or_else(|| invalid_descriptor(descriptor))?;
        let type_name = object.type_name();
        extract(object.value()).ok_or_else(|| {
            NativeError::new(
                codes::OBJECT_NULL,
                format!("descriptor {descriptor} is a {type_name}, not a {expected}"),
            )
        })
    }

    fn family(&self, descriptor: NativeDescriptor) -> NativeResult<Family> {
        let object = self
            .objects
            .get(&descriptor.raw())
            .ok_or_else(|| invalid_descriptor(descriptor))?;
        Ok(Family::Object(object.dataset().unwrap_or(descriptor.raw())))
    }

    fn dataset_spec(&self, dataset: NativeDescriptor) -> NativeResult<Arc<DatasetSpec>> {
        self.inspect(dataset, "Dataset", |o| match o {
            Object::Dataset { spec, .. } => Some(Arc::clone(spec)),
            _ => None,
        })
    }

    fn layer_spec(&self, layer: NativeDescriptor) -> NativeResult<(u64, Arc<DatasetSpec>, usize)> {
        self.inspect(layer, "Layer", |o| match o {
            Object::Layer {
                dataset,
                spec,
                index,
            } => Some((*dataset, Arc::clone(spec), *index)),
            _ => None,
        })
    }

    fn geometry(&self, geometry: NativeDescriptor) -> NativeResult<Geometry> {
        self.inspect(geometry, "Geometry", |o| match o {
            Object::Geometry(g) => Some(g.clone()),
            _ => None,
        })
    }

    fn srs_code(&self, srs: NativeDescriptor) -> NativeResult<u32> {
        self.inspect(srs, "SpatialReference", |o| match o {
            Object::SpatialReference(code) => Some(*code),
            _ => None,
        })
    }

    fn is_directory(&self, key: &str) -> bool {
        let prefix = format!("{key}/");
        self.files.iter().any(|entry| entry.key().starts_with(&prefix))
    }
}

impl fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("version", &self.version)
            .field("files", &self.files.len())
            .field("live_objects", &self.objects.len())
            .finish_non_exhaustive()
    }
}

fn invalid_descriptor(descriptor: NativeDescriptor) -> NativeError {
    NativeError::new(
        codes::OBJECT_NULL,
        format!("descriptor {descriptor} does not refer to a live object"),
    )
}

fn parse_srs(input: &str) -> Option<u32> {
    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();
    if upper == "WGS84" || upper == "CRS84" || upper == "OGC:CRS84" {
        return Some(EPSG_WGS84);
    }
    if let Some(code) = upper.strip_prefix("EPSG:") {
        return code.trim().parse().ok().filter(|c| *c > 0);
    }
    // WKT: the last AUTHORITY clause names the whole definition.
    let marker = "AUTHORITY[\"EPSG\",\"";
    let start = trimmed.rfind(marker)? + marker.len();
    let end = trimmed[start..].find('"')? + start;
    trimmed[start..end].parse().ok().filter(|c| *c > 0)
}

fn srs_wkt(code: u32) -> String {
    match code {
        EPSG_WGS84 => "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],\
PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433],AUTHORITY[\"EPSG\",\"4326\"]]"
            .to_string(),
        EPSG_WEB_MERCATOR => "PROJCS[\"WGS 84 / Pseudo-Mercator\",GEOGCS[\"WGS 84\"],\
PROJECTION[\"Mercator_1SP\"],UNIT[\"metre\",1],AUTHORITY[\"EPSG\",\"3857\"]]"
            .to_string(),
        other => format!("LOCAL_CS[\"EPSG:{other}\",AUTHORITY[\"EPSG\",\"{other}\"]]"),
    }
}

fn transform_supported(source: u32, target: u32) -> bool {
    source == target
        || matches!(
            (source, target),
            (EPSG_WGS84, EPSG_WEB_MERCATOR) | (EPSG_WEB_MERCATOR, EPSG_WGS84)
        )
}

impl NativeEngine for MemoryEngine {
    fn version(&self) -> EngineVersion {
        self.version
    }

    fn drivers(&self) -> NativeResult<Vec<String>> {
        self.call("drivers", Family::Shared, || Ok(self.drivers.clone()))
    }

    fn open(&self, path: &str, options: &OpenOptions) -> NativeResult<NativeDescriptor> {
        self.call("open", Family::Shared, || {
            let key = normalize_path(path);
            let file = match self.files.get(&key) {
                Some(file) => file.value().clone(),
                None if self.is_directory(&key) => {
                    return Err(unrecognized_format_error(self.version, path))
                }
                None => return Err(missing_path_error(self.version, path)),
            };

            let spec = match file {
                MemoryFile::Dataset(spec) => spec,
                MemoryFile::Bytes(_) => return Err(unrecognized_format_error(self.version, path)),
            };
            let registered = self.drivers.iter().any(|d| *d == spec.driver);
            let allowed = options.allowed_drivers.is_empty()
                || options
                    .allowed_drivers
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(&spec.driver));
            if !registered || !allowed {
                return Err(unrecognized_format_error(self.version, path));
            }
            if options.access == AccessMode::Update
                && (path.starts_with(VSICURL_PREFIX) || path.starts_with(VSIS3_PREFIX))
            {
                return Err(NativeError::new(
                    codes::NO_WRITE_ACCESS,
                    format!("{path}: remote files cannot be opened in update mode"),
                ));
            }

            Ok(self.insert(Object::Dataset {
                path: path.to_string(),
                spec: Arc::new(spec),
            }))
        })
    }

    fn release(&self, descriptor: NativeDescriptor) -> NativeResult<()> {
        let family = self.family(descriptor).inspect_err(|_| {
            self.invalid_releases.fetch_add(1, Ordering::Relaxed);
        })?;
        self.call("release", family, || {
            let Some((raw, object)) = self.objects.remove(&descriptor.raw()) else {
                self.invalid_releases.fetch_add(1, Ordering::Relaxed);
                return Err(invalid_descriptor(descriptor));
            };
            self.releases.fetch_add(1, Ordering::Relaxed);

            // Bands and layers die with their dataset; features are copies.
            if let Object::Dataset { .. } = object {
                self.objects.retain(|_, child| {
                    child.dataset() != Some(raw) || matches!(child, Object::Feature { .. })
                });
            }
            Ok(())
        })
    }

    fn driver_name(&self, dataset: NativeDescriptor) -> NativeResult<String> {
        let spec = self.dataset_spec(dataset)?;
        self.call("driver_name", Family::Object(dataset.raw()), || {
            Ok(spec.driver.clone())
        })
    }

    fn description(&self, dataset: NativeDescriptor) -> NativeResult<String> {
        let path = self.inspect(dataset, "Dataset", |o| match o {
            Object::Dataset { path, .. } => Some(path.clone()),
            _ => None,
        })?;
        self.call("description", Family::Object(dataset.raw()), || Ok(path))
    }

    fn raster_size(&self, dataset: NativeDescriptor) -> NativeResult<RasterSize> {
        let spec = self.dataset_spec(dataset)?;
        self.call("raster_size", Family::Object(dataset.raw()), || {
            Ok(RasterSize {
                width: spec.width,
                height: spec.height,
            })
        })
    }

    fn raster_count(&self, dataset: NativeDescriptor) -> NativeResult<usize> {
        let spec = self.dataset_spec(dataset)?;
        self.call("raster_count", Family::Object(dataset.raw()), || {
            Ok(spec.bands.len())
        })
    }

    fn band(&self, dataset: NativeDescriptor, index: usize) -> NativeResult<NativeDescriptor> {
        let spec = self.dataset_spec(dataset)?;
        self.call("band", Family::Object(dataset.raw()), || {
            if index == 0 || index > spec.bands.len() {
                return Err(NativeError::new(
                    codes::ILLEGAL_ARG,
                    format!("GDALDataset::GetRasterBand({index}) - Illegal band #"),
                ));
            }
            Ok(self.insert(Object::Band {
                dataset: dataset.raw(),
                spec: Arc::clone(&spec),
                index: index - 1,
            }))
        })
    }

    fn band_info(&self, band: NativeDescriptor) -> NativeResult<BandInfo> {
        let (dataset, spec, index) = self.inspect(band, "RasterBand", |o| match o {
            Object::Band {
                dataset,
                spec,
                index,
            } => Some((*dataset, Arc::clone(spec), *index)),
            _ => None,
        })?;
        self.call("band_info", Family::Object(dataset), || {
            let band = &spec.bands[index];
            Ok(BandInfo {
                width: spec.width,
                height: spec.height,
                data_type: band.data_type.clone(),
                no_data: band.no_data,
            })
        })
    }

    fn layer_count(&self, dataset: NativeDescriptor) -> NativeResult<usize> {
        let spec = self.dataset_spec(dataset)?;
        self.call("layer_count", Family::Object(dataset.raw()), || {
            Ok(spec.layers.len())
        })
    }

    fn layer(
        &self,
        dataset: NativeDescriptor,
        selector: &LayerSelector,
    ) -> NativeResult<NativeDescriptor> {
        let spec = self.dataset_spec(dataset)?;
        self.call("layer", Family::Object(dataset.raw()), || {
            let index = match selector {
                LayerSelector::Index(i) if *i < spec.layers.len() => *i,
                LayerSelector::Index(i) => {
                    return Err(NativeError::new(
                        codes::OBJECT_NULL,
                        format!("Layer index {i} out of range"),
                    ))
                }
                LayerSelector::Name(name) => spec
                    .layers
                    .iter()
                    .position(|l| l.name == *name)
                    .ok_or_else(|| {
                        NativeError::new(codes::OBJECT_NULL, format!("Layer '{name}' not found"))
                    })?,
            };
            Ok(self.insert(Object::Layer {
                dataset: dataset.raw(),
                spec: Arc::clone(&spec),
                index,
            }))
        })
    }

    fn layer_info(&self, layer: NativeDescriptor) -> NativeResult<LayerInfo> {
        let (dataset, spec, index) = self.layer_spec(layer)?;
        self.call("layer_info", Family::Object(dataset), || {
            let layer = &spec.layers[index];
            Ok(LayerInfo {
                name: layer.name.clone(),
                feature_count: layer.features.len() as u64,
                geometry_type: layer.geometry_type.clone(),
            })
        })
    }

    fn feature_ids(&self, layer: NativeDescriptor) -> NativeResult<Vec<u64>> {
        let (dataset, spec, index) = self.layer_spec(layer)?;
        self.call("feature_ids", Family::Object(dataset), || {
            Ok(spec.layers[index].features.iter().map(|f| f.fid).collect())
        })
    }

    fn feature(&self, layer: NativeDescriptor, fid: u64) -> NativeResult<NativeDescriptor> {
        let (dataset, spec, index) = self.layer_spec(layer)?;
        self.call("feature", Family::Object(dataset), || {
            let feature = spec.layers[index]
                .features
                .iter()
                .find(|f| f.fid == fid)
                .ok_or_else(|| {
                    NativeError::new(codes::OBJECT_NULL, format!("Feature {fid} not found"))
                })?;
            Ok(self.insert(Object::Feature {
                dataset,
                fid,
                wkt: feature.wkt.clone(),
            }))
        })
    }

    fn feature_geometry(&self, feature: NativeDescriptor) -> NativeResult<NativeDescriptor> {
        let (dataset, wkt) = self.inspect(feature, "Feature", |o| match o {
            Object::Feature { dataset, wkt, .. } => Some((*dataset, wkt.clone())),
            _ => None,
        })?;
        self.call("feature_geometry", Family::Object(dataset), || {
            let geometry = Geometry::parse(&wkt)
                .map_err(|e| NativeError::new(codes::APP_DEFINED, format!("Corrupt feature geometry: {e}")))?;
            Ok(self.insert(Object::Geometry(geometry)))
        })
    }

    fn geometry_from_wkt(&self, wkt: &str) -> NativeResult<NativeDescriptor> {
        self.call("geometry_from_wkt", Family::Shared, || {
            let geometry = Geometry::parse(wkt)
                .map_err(|e| NativeError::new(codes::ILLEGAL_ARG, format!("Invalid WKT: {e}")))?;
            Ok(self.insert(Object::Geometry(geometry)))
        })
    }

    fn geometry_wkt(&self, geometry: NativeDescriptor) -> NativeResult<String> {
        let g = self.geometry(geometry)?;
        self.call("geometry_wkt", Family::Object(geometry.raw()), || Ok(g.to_wkt()))
    }

    fn geometry_measure(
        &self,
        geometry: NativeDescriptor,
        measure: GeometryMeasure,
    ) -> NativeResult<f64> {
        let g = self.geometry(geometry)?;
        self.call("geometry_measure", Family::Object(geometry.raw()), || {
            Ok(match measure {
                GeometryMeasure::Area => g.area(),
                GeometryMeasure::Length => g.length(),
            })
        })
    }

    fn geometry_is_valid(&self, geometry: NativeDescriptor) -> NativeResult<bool> {
        let g = self.geometry(geometry)?;
        self.call("geometry_is_valid", Family::Object(geometry.raw()), || {
            Ok(g.is_valid())
        })
    }

    fn transform_geometry(
        &self,
        geometry: NativeDescriptor,
        transformation: NativeDescriptor,
    ) -> NativeResult<NativeDescriptor> {
        let g = self.geometry(geometry)?;
        let (source, target) = self.inspect(transformation, "CoordinateTransformation", |o| {
            match o {
                Object::Transformation { source, target } => Some((*source, *target)),
                _ => None,
            }
        })?;
        let family = Family::Pair(geometry.raw(), transformation.raw());
        self.call("transform_geometry", family, || {
            let transformed = match (source, target) {
                (EPSG_WGS84, EPSG_WEB_MERCATOR) => g.map_coords(geometry::to_web_mercator),
                (EPSG_WEB_MERCATOR, EPSG_WGS84) => g.map_coords(geometry::from_web_mercator),
                _ => g,
            };
            Ok(self.insert(Object::Geometry(transformed)))
        })
    }

    fn spatial_reference(&self, user_input: &str) -> NativeResult<NativeDescriptor> {
        self.call("spatial_reference", Family::Shared, || {
            let code = parse_srs(user_input).ok_or_else(|| {
                NativeError::new(
                    codes::ILLEGAL_ARG,
                    format!("Failed to process SRS definition: {user_input}"),
                )
            })?;
            Ok(self.insert(Object::SpatialReference(code)))
        })
    }

    fn srs_wkt(&self, srs: NativeDescriptor) -> NativeResult<String> {
        let code = self.srs_code(srs)?;
        self.call("srs_wkt", Family::Object(srs.raw()), || Ok(srs_wkt(code)))
    }

    fn srs_authority_code(&self, srs: NativeDescriptor) -> NativeResult<Option<String>> {
        let code = self.srs_code(srs)?;
        self.call("srs_authority_code", Family::Object(srs.raw()), || {
            Ok(Some(format!("EPSG:{code}")))
        })
    }

    fn coordinate_transformation(
        &self,
        source: NativeDescriptor,
        target: NativeDescriptor,
    ) -> NativeResult<NativeDescriptor> {
        let from = self.srs_code(source)?;
        let to = self.srs_code(target)?;
        let family = Family::Pair(source.raw(), target.raw());
        self.call("coordinate_transformation", family, || {
            if !transform_supported(from, to) {
                return Err(NativeError::new(
                    codes::NOT_SUPPORTED,
                    format!("Cannot find coordinate operations from `EPSG:{from}' to `EPSG:{to}'"),
                ));
            }
            Ok(self.insert(Object::Transformation {
                source: from,
                target: to,
            }))
        })
    }

    fn set_config_option(&self, key: &str, value: Option<&str>) -> NativeResult<()> {
        self.call("set_config_option", Family::Exclusive, || {
            let mut config = self.config.write();
            match value {
                Some(value) => {
                    config.insert(key.to_string(), value.to_string());
                }
                None => {
                    config.remove(key);
                }
            }
            Ok(())
        })
    }

    fn config_option(&self, key: &str) -> NativeResult<Option<String>> {
        self.call("config_option", Family::Shared, || {
            Ok(self.config.read().get(key).cloned())
        })
    }

    fn stat(&self, path: &str) -> NativeResult<VsiStat> {
        self.call("stat", Family::Shared, || {
            let key = normalize_path(path);
            if let Some(file) = self.files.get(&key) {
                return Ok(VsiStat {
                    kind: VsiEntryKind::File,
                    size: file.size(),
                });
            }
            if self.is_directory(&key) {
                return Ok(VsiStat {
                    kind: VsiEntryKind::Directory,
                    size: 0,
                });
            }
            Err(missing_path_error(self.version, path))
        })
    }

    fn read_dir(&self, path: &str) -> NativeResult<Vec<String>> {
        self.call("read_dir", Family::Shared, || {
            let key = normalize_path(path);
            let prefix = if key.ends_with('/') {
                key.clone()
            } else {
                format!("{key}/")
            };

            let children: BTreeSet<String> = self
                .files
                .iter()
                .filter_map(|entry| {
                    let rest = entry.key().strip_prefix(&prefix)?;
                    rest.split('/').next().map(str::to_string)
                })
                .collect();

            if children.is_empty() {
                if self.files.contains_key(&key) {
                    return Err(NativeError::new(
                        codes::FILE_IO,
                        format!("{path}: Not a directory"),
                    ));
                }
                return Err(missing_path_error(self.version, path));
            }
            Ok(children.into_iter().collect())
        })
    }
}
