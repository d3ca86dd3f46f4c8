//! Integration tests for resource lifecycle.
//!
//! These tests drive the public API against the in-memory engine:
//! - Opening, reading and closing datasets
//! - Child invalidation when a parent closes
//! - Reclamation of unreachable handles
//! - Shutdown releasing everything exactly once
//! - Virtual file system introspection

use std::sync::Arc;

use geobridge::engine::memory::{
    BandSpec, DatasetSpec, LayerSpec, MemoryEngine, MemoryFile,
};
use geobridge::engine::{OpenOptions, VsiEntryKind};
use geobridge::{Bridge, ErrorKind, ResourceKind};

// =============================================================================
// Test Helpers
// =============================================================================

const SAMPLE_TIF: &str = "/vsimem/fixtures/sample.tif";
const ROADS: &str = "/vsimem/fixtures/roads.geojson";

fn sample_engine() -> Arc<MemoryEngine> {
    let raster = DatasetSpec::raster("GTiff", 100, 50)
        .with_band(BandSpec::new("Byte").with_no_data(0.0))
        .with_band(BandSpec::new("UInt16"));
    let vector = DatasetSpec::vector("GeoJSON").with_layer(
        LayerSpec::new("roads", "LineString")
            .with_feature(1, "LINESTRING (0 0,3 4)")
            .with_feature(2, "LINESTRING (0 0,0 10)"),
    );
    Arc::new(
        MemoryEngine::new()
            .with_file(SAMPLE_TIF, MemoryFile::Dataset(raster))
            .with_file(ROADS, MemoryFile::Dataset(vector)),
    )
}

fn bridge(engine: &Arc<MemoryEngine>) -> Bridge {
    Bridge::builder(Arc::clone(engine))
        .workers(4)
        .build()
        .expect("bridge should start")
}

// =============================================================================
// Integration Tests
// =============================================================================

#[test]
fn test_raster_dataset_lifecycle() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let dataset = bridge.open(SAMPLE_TIF).unwrap();
    assert_eq!(dataset.kind(), ResourceKind::Dataset);
    assert_eq!(dataset.driver_name().unwrap(), "GTiff");
    assert_eq!(dataset.description().unwrap(), SAMPLE_TIF);
    assert_eq!(dataset.raster_count().unwrap(), 2);

    let size = dataset.raster_size().unwrap();
    assert_eq!((size.width, size.height), (100, 50));

    let band = dataset.band(1).unwrap();
    let info = band.info().unwrap();
    assert_eq!(info.data_type, "Byte");
    assert_eq!(info.no_data, Some(0.0));
    assert_eq!(band.index(), 1);

    dataset.close().unwrap();
    assert!(!dataset.is_valid());
    assert!(!band.is_valid());

    let err = dataset.raster_size().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceClosed);
    assert_eq!(engine.live_objects(), 0);
}

#[tokio::test]
async fn test_async_raster_reads() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let dataset = bridge.open_async(SAMPLE_TIF).await.unwrap();
    let size = dataset.raster_size_async().await.unwrap();
    let band = dataset.band_async(2).await.unwrap();
    let info = band.info_async().await.unwrap();

    assert_eq!(size.width, 100);
    assert_eq!(info.data_type, "UInt16");
    assert_eq!(info.no_data, None);

    dataset.close_async().await.unwrap();
    let err = band.info_async().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceClosed);
}

#[test]
fn test_vector_children_invalid_after_parent_close() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let dataset = bridge.open(ROADS).unwrap();
    assert_eq!(dataset.layer_count().unwrap(), 1);
    let layer = dataset.layer_by_name("roads").unwrap();
    let feature = layer.feature(1).unwrap();
    let geometry = feature.geometry().unwrap();

    dataset.close().unwrap();

    let err = layer.info().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceClosed);
    assert!(err.message().contains("Dataset"));
    assert_eq!(
        feature.geometry().unwrap_err().kind(),
        ErrorKind::ResourceClosed
    );
    assert_eq!(feature.fid(), 1);

    // The geometry is a clone with no parent.
    assert!(geometry.is_valid());
    assert_eq!(geometry.length().unwrap(), 5.0);

    // Closing children after their dataset releases only what they own.
    layer.close().unwrap();
    feature.close().unwrap();
    geometry.close().unwrap();
    assert_eq!(engine.live_objects(), 0);
    assert_eq!(engine.invalid_release_count(), 0);
}

#[test]
fn test_layer_lookup_and_features() {
    let engine = sample_engine();
    let bridge = bridge(&engine);
    let dataset = bridge.open(ROADS).unwrap();

    let layer = dataset.layer(0).unwrap();
    let info = layer.info().unwrap();
    assert_eq!(info.name, "roads");
    assert_eq!(info.feature_count, 2);
    assert_eq!(info.geometry_type, "LineString");

    let fids: Vec<u64> = layer.features().unwrap().iter().map(|f| f.fid()).collect();
    assert_eq!(fids, vec![1, 2]);

    let err = dataset.layer_by_name("rivers").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = dataset.layer(3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_same_path_opened_twice_is_independent() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let first = bridge.open(SAMPLE_TIF).unwrap();
    let second = bridge.open(SAMPLE_TIF).unwrap();
    assert_ne!(first.id(), second.id());

    first.close().unwrap();
    assert!(!first.is_valid());
    assert_eq!(second.raster_count().unwrap(), 2);
}

#[test]
fn test_unreachable_handle_reclaimed() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let dataset = bridge.open(SAMPLE_TIF).unwrap();
    let band = dataset.band(1).unwrap();
    let observer = dataset.downgrade();

    drop(dataset);
    bridge.reclaim();

    assert!(!observer.is_reachable());
    assert!(!observer.is_valid());
    let err = band.info().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceClosed);

    drop(band);
    bridge.reclaim();
    assert_eq!(engine.live_objects(), 0);
    assert_eq!(engine.invalid_release_count(), 0);
    assert_eq!(bridge.stats().open_resources, 0);
}

#[test]
fn test_abandoned_async_result_is_reclaimed() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let pending = bridge.open_async(SAMPLE_TIF);
    drop(pending);

    // The open still runs; its dataset is finalized once nobody can reach it.
    bridge.set_config_option("BARRIER", Some("1")).unwrap();
    bridge.reclaim();

    assert_eq!(engine.live_objects(), 0);
    assert_eq!(bridge.stats().open_resources, 0);
}

#[test]
fn test_shutdown_releases_everything_once() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let raster = bridge.open(SAMPLE_TIF).unwrap();
    let _band = raster.band(2).unwrap();
    let vector = bridge.open(ROADS).unwrap();
    let layer = vector.layer(0).unwrap();
    let _features = layer.features().unwrap();
    let wgs84 = bridge.spatial_reference("EPSG:4326").unwrap();
    let mercator = bridge.spatial_reference("EPSG:3857").unwrap();
    let _ct = bridge.coordinate_transformation(&wgs84, &mercator).unwrap();
    assert!(engine.live_objects() > 0);

    drop(bridge);

    assert_eq!(engine.live_objects(), 0);
    assert_eq!(engine.invalid_release_count(), 0);
    assert_eq!(
        layer.info().unwrap_err().kind(),
        ErrorKind::ResourceClosed
    );
}

#[test]
fn test_geometry_and_spatial_reference() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let square = bridge
        .geometry_from_wkt("POLYGON ((0 0,2 0,2 2,0 2,0 0))")
        .unwrap();
    assert_eq!(square.area().unwrap(), 4.0);
    assert_eq!(square.length().unwrap(), 8.0);
    assert!(square.is_geometry_valid().unwrap());

    let wgs84 = bridge.spatial_reference("EPSG:4326").unwrap();
    assert_eq!(wgs84.authority_code().unwrap(), Some("EPSG:4326".to_string()));
    assert!(wgs84.wkt().unwrap().contains("WGS 84"));

    let mercator = bridge.spatial_reference("EPSG:3857").unwrap();
    let ct = bridge.coordinate_transformation(&wgs84, &mercator).unwrap();
    assert_eq!(ct.source(), wgs84.id());
    assert_eq!(ct.target(), mercator.id());

    // The transformation captured both references.
    wgs84.close().unwrap();
    mercator.close().unwrap();

    let origin = bridge.geometry_from_wkt("POINT (0 0)").unwrap();
    let projected = origin.transform(&ct).unwrap();
    assert!(projected.wkt().unwrap().starts_with("POINT (0 "));
    assert_ne!(projected.id(), origin.id());
    assert_eq!(origin.wkt().unwrap(), "POINT (0 0)");

    let err = bridge.geometry_from_wkt("POINT (").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_unsupported_transformation() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let wgs84 = bridge.spatial_reference("EPSG:4326").unwrap();
    let other = bridge.spatial_reference("EPSG:27700").unwrap();

    let err = bridge.coordinate_transformation(&wgs84, &other).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NativeFailure);
    assert_eq!(err.native_code(), Some(6));
}

#[test]
fn test_open_with_driver_filter() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let dataset = bridge
        .open_with(SAMPLE_TIF, OpenOptions::default().with_driver("GTiff"))
        .unwrap();
    assert!(dataset.is_valid());

    let err = bridge
        .open_with(SAMPLE_TIF, OpenOptions::default().with_driver("GeoJSON"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn test_virtual_file_system_introspection() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let listing = bridge.read_dir("/vsimem/fixtures").unwrap();
    assert_eq!(listing, vec!["roads.geojson", "sample.tif"]);

    let stat = bridge.stat(SAMPLE_TIF).unwrap();
    assert_eq!(stat.kind, VsiEntryKind::File);
    assert!(stat.size > 0);

    let dir = bridge.stat("/vsimem/fixtures/").unwrap();
    assert_eq!(dir.kind, VsiEntryKind::Directory);

    let err = bridge.stat("/vsimem/fixtures/missing.tif").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_virtual_file_system_async() {
    let engine = sample_engine();
    let bridge = bridge(&engine);

    let listing = bridge.read_dir_async("/vsimem").await.unwrap();
    assert_eq!(listing, vec!["fixtures"]);
    let drivers = bridge.drivers_async().await.unwrap();
    assert!(drivers.iter().any(|d| d == "GeoJSON"));
}
