//! Production backend over the `gdal` crate.
//!
//! Native objects live in a descriptor table. The `gdal` API ties bands,
//! layers and features to a borrow of their dataset, so those are stored as
//! a dataset descriptor plus a selector and resolved again on every call.
//!
//! The table lock is held for the duration of each native call. Objects are
//! borrowed straight out of the table, which makes every call on one engine
//! run alone; the lock domains above it only add ordering.
//!
//! Virtual file system introspection goes through `VSIStatL` and `VSIReadDir`,
//! so `/vsimem/`, `/vsicurl/` and local paths behave as GDAL sees them.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::fs;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

use gdal::errors::GdalError;
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::vector::{geometry_type_to_name, Geometry, Layer, LayerAccess};
use gdal::{Dataset, DatasetOptions, DriverManager, GdalOpenFlags, Metadata};
use parking_lot::Mutex;

use super::{
    codes, AccessMode, BandInfo, EngineVersion, GeometryMeasure, LayerInfo, LayerSelector,
    NativeDescriptor, NativeEngine, NativeError, NativeResult, OpenOptions, RasterSize, VsiEntryKind,
    VsiStat,
};

/// Assumed when the library reports a version string we cannot parse.
const FALLBACK_VERSION: EngineVersion = EngineVersion::new(3, 0, 0);

enum Object {
    Dataset(Dataset),
    Band {
        dataset: u64,
        index: usize,
    },
    Layer {
        dataset: u64,
        selector: LayerSelector,
    },
    Feature {
        dataset: u64,
        layer: LayerSelector,
        fid: u64,
    },
    Geometry(Geometry),
    SpatialReference(SpatialRef),
    Transformation(CoordTransform),
}

impl Object {
    fn owner(&self) -> Option<u64> {
        match self {
            Self::Band { dataset, .. } | Self::Layer { dataset, .. } => Some(*dataset),
            _ => None,
        }
    }
}

struct Slot(Object);

// SAFETY: slots are only reached through `GdalEngine::objects`, and that lock
// is held for as long as any native object is in use, so no two threads ever
// touch one object at the same time.
unsafe impl Send for Slot {}

type Table = HashMap<u64, Slot>;

/// [`NativeEngine`] backed by the GDAL library.
pub struct GdalEngine {
    version: EngineVersion,
    objects: Mutex<Table>,
    next_descriptor: AtomicU64,
}

impl Default for GdalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GdalEngine {
    pub fn new() -> Self {
        let reported = gdal::version::version_info("VERSION_NUM");
        let version = EngineVersion::parse(&reported).unwrap_or_else(|| {
            tracing::warn!(reported = %reported, fallback = %FALLBACK_VERSION, "Unrecognized GDAL version");
            FALLBACK_VERSION
        });
        tracing::debug!(version = %version, "GDAL engine initialized");

        Self {
            version,
            objects: Mutex::new(HashMap::new()),
            next_descriptor: AtomicU64::new(1),
        }
    }

    fn insert(&self, table: &mut Table, object: Object) -> NativeDescriptor {
        let raw = self.next_descriptor.fetch_add(1, Ordering::Relaxed);
        table.insert(raw, Slot(object));
        NativeDescriptor::new(raw)
    }
}

// =============================================================================
// Table lookups
// =============================================================================

fn lookup(table: &Table, descriptor: NativeDescriptor) -> NativeResult<&Object> {
    table
        .get(&descriptor.raw())
        .map(|slot| &slot.0)
        .ok_or_else(|| invalid_descriptor(descriptor))
}

fn dataset_at(table: &Table, raw: u64) -> NativeResult<&Dataset> {
    match table.get(&raw).map(|slot| &slot.0) {
        Some(Object::Dataset(dataset)) => Ok(dataset),
        Some(_) => Err(wrong_type(NativeDescriptor::new(raw), "Dataset")),
        None => Err(invalid_descriptor(NativeDescriptor::new(raw))),
    }
}

fn open_layer<'a>(dataset: &'a Dataset, selector: &LayerSelector) -> NativeResult<Layer<'a>> {
    match selector {
        LayerSelector::Index(index) => {
            let index = isize::try_from(*index).map_err(|_| illegal_layer(selector))?;
            dataset
                .layer(index)
                .map_err(|e| native_error(e, codes::ILLEGAL_ARG))
        }
        LayerSelector::Name(name) => dataset
            .layer_by_name(name)
            .map_err(|e| native_error(e, codes::ILLEGAL_ARG)),
    }
}

fn resolve_layer<'a>(table: &'a Table, layer: NativeDescriptor) -> NativeResult<Layer<'a>> {
    match lookup(table, layer)? {
        Object::Layer { dataset, selector } => open_layer(dataset_at(table, *dataset)?, selector),
        _ => Err(wrong_type(layer, "Layer")),
    }
}

fn geometry_at(table: &Table, geometry: NativeDescriptor) -> NativeResult<&Geometry> {
    match lookup(table, geometry)? {
        Object::Geometry(g) => Ok(g),
        _ => Err(wrong_type(geometry, "Geometry")),
    }
}

fn srs_at(table: &Table, srs: NativeDescriptor) -> NativeResult<&SpatialRef> {
    match lookup(table, srs)? {
        Object::SpatialReference(s) => Ok(s),
        _ => Err(wrong_type(srs, "SpatialReference")),
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Keeps the CPL error number when GDAL reports one.
fn native_error(err: GdalError, fallback_code: i32) -> NativeError {
    match err {
        GdalError::CplError { number, msg, .. } => NativeError::new(number, msg),
        GdalError::NullPointer { msg, .. } if !msg.is_empty() => NativeError::new(fallback_code, msg),
        other => NativeError::new(fallback_code, other.to_string()),
    }
}

fn invalid_descriptor(descriptor: NativeDescriptor) -> NativeError {
    NativeError::new(
        codes::OBJECT_NULL,
        format!("descriptor {descriptor} does not refer to a live object"),
    )
}

fn wrong_type(descriptor: NativeDescriptor, expected: &str) -> NativeError {
    NativeError::new(
        codes::OBJECT_NULL,
        format!("descriptor {descriptor} is not a {expected}"),
    )
}

fn illegal_layer(selector: &LayerSelector) -> NativeError {
    NativeError::new(codes::ILLEGAL_ARG, format!("no layer {selector:?}"))
}

fn non_negative(count: isize) -> usize {
    usize::try_from(count).unwrap_or(0)
}

// =============================================================================
// Virtual file system
// =============================================================================

/// File type bits of `st_mode`, as in `<sys/stat.h>`.
const S_IFMT: u32 = 0o170_000;
const S_IFDIR: u32 = 0o040_000;

fn c_path(path: &str) -> NativeResult<CString> {
    CString::new(path).map_err(|e| NativeError::new(codes::ILLEGAL_ARG, format!("{path}: {e}")))
}

/// The CPL error raised by the last call on this thread, if any.
fn take_cpl_error() -> Option<NativeError> {
    let number = unsafe { gdal_sys::CPLGetLastErrorNo() };
    if number == 0 {
        return None;
    }
    let msg = unsafe { CStr::from_ptr(gdal_sys::CPLGetLastErrorMsg()) }
        .to_string_lossy()
        .into_owned();
    unsafe { gdal_sys::CPLErrorReset() };
    Some(NativeError::new(number, msg))
}

/// `VSIStatL` fails silently for a missing entry. Local paths ask the OS for
/// the reason.
fn vsi_failure(path: &str) -> NativeError {
    if let Some(err) = take_cpl_error() {
        return err;
    }
    let reason = match fs::metadata(path) {
        Err(err) if !path.starts_with("/vsi") => err.to_string(),
        _ => "No such file or directory".to_string(),
    };
    NativeError::new(codes::OPEN_FAILED, format!("{path}: {reason}"))
}

fn vsi_stat(path: &str) -> NativeResult<VsiStat> {
    let c_path = c_path(path)?;
    let mut buf = MaybeUninit::<gdal_sys::VSIStatBufL>::zeroed();
    let rv = unsafe {
        gdal_sys::CPLErrorReset();
        gdal_sys::VSIStatL(c_path.as_ptr(), buf.as_mut_ptr())
    };
    if rv != 0 {
        return Err(vsi_failure(path));
    }
    // Filled in on success.
    let buf = unsafe { buf.assume_init() };

    Ok(if (buf.st_mode as u32) & S_IFMT == S_IFDIR {
        VsiStat {
            kind: VsiEntryKind::Directory,
            size: 0,
        }
    } else {
        VsiStat {
            kind: VsiEntryKind::File,
            size: u64::try_from(buf.st_size).unwrap_or(0),
        }
    })
}

fn vsi_read_dir(path: &str) -> NativeResult<Vec<String>> {
    let c_path = c_path(path)?;
    let list = unsafe { gdal_sys::VSIReadDir(c_path.as_ptr()) };

    // NULL means empty, missing or not a directory; stat tells them apart.
    if list.is_null() {
        return match vsi_stat(path)?.kind {
            VsiEntryKind::Directory => Ok(Vec::new()),
            VsiEntryKind::File => Err(NativeError::new(
                codes::FILE_IO,
                format!("{path}: Not a directory"),
            )),
        };
    }

    let mut names = Vec::new();
    for i in 0.. {
        let entry = unsafe { *list.add(i) };
        if entry.is_null() {
            break;
        }
        let name = unsafe { CStr::from_ptr(entry) }.to_string_lossy().into_owned();
        if name != "." && name != ".." {
            names.push(name);
        }
    }
    unsafe { gdal_sys::CSLDestroy(list) };

    names.sort();
    Ok(names)
}

// =============================================================================
// Engine
// =============================================================================

impl NativeEngine for GdalEngine {
    fn version(&self) -> EngineVersion {
        self.version
    }

    fn drivers(&self) -> NativeResult<Vec<String>> {
        let drivers = (0..DriverManager::count())
            .filter_map(|i| DriverManager::get_driver(i).ok())
            .map(|driver| driver.short_name())
            .collect();
        Ok(drivers)
    }

    fn open(&self, path: &str, options: &OpenOptions) -> NativeResult<NativeDescriptor> {
        let mut flags = GdalOpenFlags::GDAL_OF_RASTER
            | GdalOpenFlags::GDAL_OF_VECTOR
            | GdalOpenFlags::GDAL_OF_VERBOSE_ERROR;
        if options.access == AccessMode::Update {
            flags |= GdalOpenFlags::GDAL_OF_UPDATE;
        }
        let drivers: Vec<&str> = options.allowed_drivers.iter().map(String::as_str).collect();

        let mut table = self.objects.lock();
        let dataset = Dataset::open_ex(
            path,
            DatasetOptions {
                open_flags: flags,
                allowed_drivers: (!drivers.is_empty()).then_some(drivers.as_slice()),
                ..DatasetOptions::default()
            },
        )
        .map_err(|e| native_error(e, codes::OPEN_FAILED))?;

        Ok(self.insert(&mut table, Object::Dataset(dataset)))
    }

    fn release(&self, descriptor: NativeDescriptor) -> NativeResult<()> {
        let mut table = self.objects.lock();
        let Slot(object) = table
            .remove(&descriptor.raw())
            .ok_or_else(|| invalid_descriptor(descriptor))?;

        // Bands and layers go with their dataset; features keep only an id.
        if let Object::Dataset(_) = object {
            table.retain(|_, slot| slot.0.owner() != Some(descriptor.raw()));
        }
        drop(object);
        Ok(())
    }

    fn driver_name(&self, dataset: NativeDescriptor) -> NativeResult<String> {
        let table = self.objects.lock();
        Ok(dataset_at(&table, dataset.raw())?.driver().short_name())
    }

    fn description(&self, dataset: NativeDescriptor) -> NativeResult<String> {
        let table = self.objects.lock();
        dataset_at(&table, dataset.raw())?
            .description()
            .map_err(|e| native_error(e, codes::APP_DEFINED))
    }

    fn raster_size(&self, dataset: NativeDescriptor) -> NativeResult<RasterSize> {
        let table = self.objects.lock();
        let (width, height) = dataset_at(&table, dataset.raw())?.raster_size();
        Ok(RasterSize { width, height })
    }

    fn raster_count(&self, dataset: NativeDescriptor) -> NativeResult<usize> {
        let table = self.objects.lock();
        Ok(non_negative(dataset_at(&table, dataset.raw())?.raster_count()))
    }

    fn band(&self, dataset: NativeDescriptor, index: usize) -> NativeResult<NativeDescriptor> {
        let mut table = self.objects.lock();
        let band_index = isize::try_from(index).map_err(|_| {
            NativeError::new(codes::ILLEGAL_ARG, format!("Illegal band #{index}"))
        })?;
        dataset_at(&table, dataset.raw())?
            .rasterband(band_index)
            .map_err(|e| native_error(e, codes::ILLEGAL_ARG))?;

        Ok(self.insert(
            &mut table,
            Object::Band {
                dataset: dataset.raw(),
                index,
            },
        ))
    }

    fn band_info(&self, band: NativeDescriptor) -> NativeResult<BandInfo> {
        let table = self.objects.lock();
        let Object::Band { dataset, index } = lookup(&table, band)? else {
            return Err(wrong_type(band, "RasterBand"));
        };
        let band_index = isize::try_from(*index)
            .map_err(|_| NativeError::new(codes::ILLEGAL_ARG, "band index out of range"))?;
        let raster = dataset_at(&table, *dataset)?
            .rasterband(band_index)
            .map_err(|e| native_error(e, codes::ILLEGAL_ARG))?;

        let (width, height) = raster.size();
        Ok(BandInfo {
            width,
            height,
            data_type: raster.band_type().name(),
            no_data: raster.no_data_value(),
        })
    }

    fn layer_count(&self, dataset: NativeDescriptor) -> NativeResult<usize> {
        let table = self.objects.lock();
        Ok(non_negative(dataset_at(&table, dataset.raw())?.layer_count()))
    }

    fn layer(
        &self,
        dataset: NativeDescriptor,
        selector: &LayerSelector,
    ) -> NativeResult<NativeDescriptor> {
        let mut table = self.objects.lock();
        open_layer(dataset_at(&table, dataset.raw())?, selector)?;

        Ok(self.insert(
            &mut table,
            Object::Layer {
                dataset: dataset.raw(),
                selector: selector.clone(),
            },
        ))
    }

    fn layer_info(&self, layer: NativeDescriptor) -> NativeResult<LayerInfo> {
        let table = self.objects.lock();
        let mut resolved = resolve_layer(&table, layer)?;

        let geometry_type = resolved
            .features()
            .find_map(|feature| {
                feature
                    .geometry()
                    .map(|g| geometry_type_to_name(g.geometry_type()))
            })
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(LayerInfo {
            name: resolved.name(),
            feature_count: resolved.feature_count(),
            geometry_type,
        })
    }

    fn feature_ids(&self, layer: NativeDescriptor) -> NativeResult<Vec<u64>> {
        let table = self.objects.lock();
        let mut resolved = resolve_layer(&table, layer)?;
        Ok(resolved.features().filter_map(|f| f.fid()).collect())
    }

    fn feature(&self, layer: NativeDescriptor, fid: u64) -> NativeResult<NativeDescriptor> {
        let mut table = self.objects.lock();
        let Object::Layer { dataset, selector } = lookup(&table, layer)? else {
            return Err(wrong_type(layer, "Layer"));
        };
        let (dataset, selector) = (*dataset, selector.clone());

        let resolved = open_layer(dataset_at(&table, dataset)?, &selector)?;
        if resolved.feature(fid).is_none() {
            return Err(NativeError::new(
                codes::ILLEGAL_ARG,
                format!("no feature with fid {fid}"),
            ));
        }
        drop(resolved);

        Ok(self.insert(
            &mut table,
            Object::Feature {
                dataset,
                layer: selector,
                fid,
            },
        ))
    }

    fn feature_geometry(&self, feature: NativeDescriptor) -> NativeResult<NativeDescriptor> {
        let mut table = self.objects.lock();
        let Object::Feature {
            dataset,
            layer,
            fid,
        } = lookup(&table, feature)?
        else {
            return Err(wrong_type(feature, "Feature"));
        };

        let resolved = open_layer(dataset_at(&table, *dataset)?, layer)?;
        let geometry = resolved
            .feature(*fid)
            .and_then(|f| f.geometry().cloned())
            .ok_or_else(|| {
                NativeError::new(codes::OBJECT_NULL, format!("feature {fid} has no geometry"))
            })?;
        drop(resolved);

        Ok(self.insert(&mut table, Object::Geometry(geometry)))
    }

    fn geometry_from_wkt(&self, wkt: &str) -> NativeResult<NativeDescriptor> {
        let geometry = Geometry::from_wkt(wkt).map_err(|e| native_error(e, codes::ILLEGAL_ARG))?;
        let mut table = self.objects.lock();
        Ok(self.insert(&mut table, Object::Geometry(geometry)))
    }

    fn geometry_wkt(&self, geometry: NativeDescriptor) -> NativeResult<String> {
        let table = self.objects.lock();
        geometry_at(&table, geometry)?
            .wkt()
            .map_err(|e| native_error(e, codes::APP_DEFINED))
    }

    fn geometry_measure(
        &self,
        geometry: NativeDescriptor,
        measure: GeometryMeasure,
    ) -> NativeResult<f64> {
        let table = self.objects.lock();
        let geometry = geometry_at(&table, geometry)?;
        Ok(match measure {
            GeometryMeasure::Area => geometry.area(),
            GeometryMeasure::Length => geometry.length(),
        })
    }

    fn geometry_is_valid(&self, geometry: NativeDescriptor) -> NativeResult<bool> {
        let table = self.objects.lock();
        Ok(geometry_at(&table, geometry)?.is_valid())
    }

    fn transform_geometry(
        &self,
        geometry: NativeDescriptor,
        transformation: NativeDescriptor,
    ) -> NativeResult<NativeDescriptor> {
        let mut table = self.objects.lock();
        let Object::Transformation(ct) = lookup(&table, transformation)? else {
            return Err(wrong_type(transformation, "CoordinateTransformation"));
        };
        let transformed = geometry_at(&table, geometry)?
            .transform(ct)
            .map_err(|e| native_error(e, codes::APP_DEFINED))?;

        Ok(self.insert(&mut table, Object::Geometry(transformed)))
    }

    fn spatial_reference(&self, user_input: &str) -> NativeResult<NativeDescriptor> {
        let srs =
            SpatialRef::from_definition(user_input).map_err(|e| native_error(e, codes::ILLEGAL_ARG))?;
        let mut table = self.objects.lock();
        Ok(self.insert(&mut table, Object::SpatialReference(srs)))
    }

    fn srs_wkt(&self, srs: NativeDescriptor) -> NativeResult<String> {
        let table = self.objects.lock();
        srs_at(&table, srs)?
            .to_wkt()
            .map_err(|e| native_error(e, codes::APP_DEFINED))
    }

    fn srs_authority_code(&self, srs: NativeDescriptor) -> NativeResult<Option<String>> {
        let table = self.objects.lock();
        let srs = srs_at(&table, srs)?;
        Ok(match (srs.auth_name(), srs.auth_code()) {
            (Ok(name), Ok(code)) => Some(format!("{name}:{code}")),
            _ => None,
        })
    }

    fn coordinate_transformation(
        &self,
        source: NativeDescriptor,
        target: NativeDescriptor,
    ) -> NativeResult<NativeDescriptor> {
        let mut table = self.objects.lock();
        let ct = CoordTransform::new(srs_at(&table, source)?, srs_at(&table, target)?)
            .map_err(|e| native_error(e, codes::NOT_SUPPORTED))?;
        Ok(self.insert(&mut table, Object::Transformation(ct)))
    }

    fn set_config_option(&self, key: &str, value: Option<&str>) -> NativeResult<()> {
        let _table = self.objects.lock();
        match value {
            Some(value) => gdal::config::set_config_option(key, value),
            None => gdal::config::clear_config_option(key),
        }
        .map_err(|e| native_error(e, codes::ILLEGAL_ARG))
    }

    fn config_option(&self, key: &str) -> NativeResult<Option<String>> {
        let _table = self.objects.lock();
        let value = gdal::config::get_config_option(key, "")
            .map_err(|e| native_error(e, codes::ILLEGAL_ARG))?;
        Ok((!value.is_empty()).then_some(value))
    }

    fn stat(&self, path: &str) -> NativeResult<VsiStat> {
        let _table = self.objects.lock();
        vsi_stat(path)
    }

    fn read_dir(&self, path: &str) -> NativeResult<Vec<String>> {
        let _table = self.objects.lock();
        vsi_read_dir(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ROADS: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","id":1,"properties":{},"geometry":{"type":"LineString","coordinates":[[0,0],[3,4]]}}
    ]}"#;

    fn roads_file(dir: &TempDir) -> String {
        let path = dir.path().join("roads.geojson");
        fs::write(&path, ROADS).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_reports_version_and_drivers() {
        let engine = GdalEngine::new();
        assert!(engine.version().major >= 2);
        assert!(engine.drivers().unwrap().iter().any(|d| d == "GeoJSON"));
    }

    #[test]
    fn test_vector_dataset_roundtrip() {
        let dir = TempDir::new().unwrap();
        let engine = GdalEngine::new();

        let dataset = engine.open(&roads_file(&dir), &OpenOptions::default()).unwrap();
        assert_eq!(engine.driver_name(dataset).unwrap(), "GeoJSON");
        assert_eq!(engine.layer_count(dataset).unwrap(), 1);

        let layer = engine.layer(dataset, &LayerSelector::Index(0)).unwrap();
        let ids = engine.feature_ids(layer).unwrap();
        assert_eq!(ids.len(), 1);

        let feature = engine.feature(layer, ids[0]).unwrap();
        let geometry = engine.feature_geometry(feature).unwrap();
        engine.release(dataset).unwrap();

        // The geometry copy outlives the dataset.
        let length = engine
            .geometry_measure(geometry, GeometryMeasure::Length)
            .unwrap();
        assert!((length - 5.0).abs() < 1e-9);
        assert!(engine.layer_info(layer).is_err());
    }

    #[test]
    fn test_missing_file_keeps_open_failed_code() {
        let dir = TempDir::new().unwrap();
        let engine = GdalEngine::new();
        let path = dir.path().join("missing.tif");

        let err = engine
            .open(&path.to_string_lossy(), &OpenOptions::default())
            .unwrap_err();
        assert_eq!(err.code, codes::OPEN_FAILED);
    }

    #[test]
    fn test_geometry_and_srs() {
        let engine = GdalEngine::new();

        let square = engine
            .geometry_from_wkt("POLYGON ((0 0,2 0,2 2,0 2,0 0))")
            .unwrap();
        let area = engine.geometry_measure(square, GeometryMeasure::Area).unwrap();
        assert!((area - 4.0).abs() < 1e-9);
        assert!(engine.geometry_is_valid(square).unwrap());

        let wgs84 = engine.spatial_reference("EPSG:4326").unwrap();
        assert_eq!(
            engine.srs_authority_code(wgs84).unwrap(),
            Some("EPSG:4326".to_string())
        );
    }

    #[test]
    fn test_local_directory_listing() {
        let dir = TempDir::new().unwrap();
        let engine = GdalEngine::new();
        let roads = roads_file(&dir);

        let listing = engine.read_dir(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(listing, vec!["roads.geojson"]);

        let stat = engine.stat(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(stat.kind, VsiEntryKind::Directory);
        assert_eq!(engine.stat(&roads).unwrap().size, ROADS.len() as u64);
        assert_eq!(engine.read_dir(&roads).unwrap_err().code, codes::FILE_IO);

        let missing = dir.path().join("missing.tif");
        let err = engine.stat(&missing.to_string_lossy()).unwrap_err();
        assert_eq!(err.code, codes::OPEN_FAILED);
        assert!(err.message.contains("No such file or directory"));
    }

    #[test]
    fn test_vsimem_stat_and_listing() {
        let engine = GdalEngine::new();
        gdal::vsi::create_mem_file("/vsimem/geobridge/a.txt", b"hello".to_vec()).unwrap();
        gdal::vsi::create_mem_file("/vsimem/geobridge/b.txt", Vec::new()).unwrap();

        let stat = engine.stat("/vsimem/geobridge/a.txt").unwrap();
        assert_eq!(stat.kind, VsiEntryKind::File);
        assert_eq!(stat.size, 5);
        assert_eq!(
            engine.read_dir("/vsimem/geobridge").unwrap(),
            vec!["a.txt", "b.txt"]
        );

        let err = engine.stat("/vsimem/geobridge/missing.txt").unwrap_err();
        assert_eq!(err.code, codes::OPEN_FAILED);

        gdal::vsi::unlink_mem_file("/vsimem/geobridge/a.txt").unwrap();
        gdal::vsi::unlink_mem_file("/vsimem/geobridge/b.txt").unwrap();
    }
}
