//! Integration tests for error classification.
//!
//! Covers the kinds callers see for common failures, that the blocking and
//! `_async` forms report them identically, and that the same failure is
//! classified the same way whichever engine release produced it.

use std::sync::Arc;

use geobridge::engine::memory::{BandSpec, DatasetSpec, Fault, MemoryEngine, MemoryFile};
use geobridge::engine::{codes, EngineVersion, NativeError, OpenOptions};
use geobridge::outcome::ShimRule;
use geobridge::{Bridge, ErrorKind};

// =============================================================================
// Test Helpers
// =============================================================================

const SAMPLE_TIF: &str = "/vsimem/data/sample.tif";
const REMOTE_TIF: &str = "/vsicurl/https://tiles.example.com/cog.tif";

fn raster() -> MemoryFile {
    MemoryFile::Dataset(DatasetSpec::raster("GTiff", 64, 64).with_band(BandSpec::new("Byte")))
}

fn engine(version: EngineVersion) -> Arc<MemoryEngine> {
    Arc::new(
        MemoryEngine::new()
            .with_version(version)
            .with_file(SAMPLE_TIF, raster())
            .with_file("/vsimem/data/notes.txt", MemoryFile::Bytes(b"hello".to_vec()))
            .with_file(REMOTE_TIF, raster()),
    )
}

fn bridge(engine: &Arc<MemoryEngine>) -> Bridge {
    Bridge::builder(Arc::clone(engine))
        .workers(2)
        .build()
        .expect("bridge should start")
}

const VERSIONS: [EngineVersion; 3] = [
    EngineVersion::new(1, 11, 5),
    EngineVersion::new(2, 4, 4),
    EngineVersion::new(3, 8, 4),
];

// =============================================================================
// Not found
// =============================================================================

#[tokio::test]
async fn test_missing_file_same_in_both_styles() {
    let engine = engine(EngineVersion::new(3, 8, 4));
    let bridge = bridge(&engine);

    let sync_err = bridge.open("/vsimem/data/missing.tif").unwrap_err();
    let async_err = bridge
        .open_async("/vsimem/data/missing.tif")
        .await
        .unwrap_err();

    assert_eq!(sync_err.kind(), ErrorKind::NotFound);
    assert_eq!(sync_err, async_err);
    assert!(sync_err.message().contains("missing.tif"));
    assert_eq!(sync_err.native_code(), Some(codes::OPEN_FAILED));
}

#[test]
fn test_missing_file_across_engine_versions() {
    for version in VERSIONS {
        let engine = engine(version);
        let bridge = bridge(&engine);

        let err = bridge.open("/vsimem/data/missing.tif").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "engine {version:?}");

        let err = bridge.open("/vsimem/data/notes.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat, "engine {version:?}");
    }
}

#[test]
fn test_remote_not_found() {
    let engine = engine(EngineVersion::new(3, 8, 4));
    let bridge = bridge(&engine);

    let err = bridge
        .open("/vsicurl/https://tiles.example.com/missing.tif")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.native_code(), Some(codes::HTTP_RESPONSE));

    let err = bridge.open("/vsis3/bucket/missing.tif").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.native_code(), Some(codes::AWS_OBJECT_NOT_FOUND));
}

// =============================================================================
// Other kinds
// =============================================================================

#[test]
fn test_unsupported_formats() {
    let engine = engine(EngineVersion::new(3, 8, 4));
    let bridge = bridge(&engine);

    let err = bridge.open("/vsimem/data/notes.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

    // A directory is not a dataset.
    let err = bridge.open("/vsimem/data").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn test_remote_update_is_native_failure() {
    let engine = engine(EngineVersion::new(3, 8, 4));
    let bridge = bridge(&engine);

    let dataset = bridge.open(REMOTE_TIF).unwrap();
    assert_eq!(dataset.raster_count().unwrap(), 1);

    let err = bridge.open_with(REMOTE_TIF, OpenOptions::update()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NativeFailure);
    assert_eq!(err.native_code(), Some(codes::NO_WRITE_ACCESS));
}

#[test]
fn test_bad_band_index_is_invalid_argument() {
    let engine = engine(EngineVersion::new(3, 8, 4));
    let bridge = bridge(&engine);
    let dataset = bridge.open(SAMPLE_TIF).unwrap();

    for index in [0, 9] {
        let err = dataset.band(index).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.native_code(), Some(codes::ILLEGAL_ARG));
    }
    // The failed lookups left the dataset usable.
    assert!(dataset.band(1).is_ok());
}

#[tokio::test]
async fn test_native_panic_becomes_native_failure() {
    let engine = engine(EngineVersion::new(3, 8, 4));
    let bridge = bridge(&engine);
    let dataset = bridge.open(SAMPLE_TIF).unwrap();

    engine.inject_fault("raster_size", Fault::Panic("bad block".to_string()));

    let sync_err = dataset.raster_size().unwrap_err();
    let async_err = dataset.raster_size_async().await.unwrap_err();
    assert_eq!(sync_err.kind(), ErrorKind::NativeFailure);
    assert!(sync_err.message().contains("bad block"));
    assert_eq!(sync_err, async_err);

    // The domain was released; later calls proceed.
    engine.clear_faults();
    assert_eq!(dataset.raster_size_async().await.unwrap().width, 64);
}

#[test]
fn test_unknown_code_is_native_failure_with_code() {
    let engine = engine(EngineVersion::new(3, 8, 4));
    let bridge = bridge(&engine);
    let dataset = bridge.open(SAMPLE_TIF).unwrap();

    engine.inject_fault(
        "driver_name",
        Fault::Error(NativeError::new(codes::ASSERTION_FAILED, "ERROR 7: broken invariant")),
    );

    let err = dataset.driver_name().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NativeFailure);
    assert_eq!(err.native_code(), Some(codes::ASSERTION_FAILED));
    assert_eq!(err.message(), "broken invariant");
}

#[test]
fn test_interrupted_call_is_aborted() {
    let engine = engine(EngineVersion::new(3, 8, 4));
    let bridge = bridge(&engine);

    engine.inject_fault(
        "open",
        Fault::Error(NativeError::new(codes::USER_INTERRUPT, "interrupted")),
    );

    let err = bridge.open(SAMPLE_TIF).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Aborted);
}

// =============================================================================
// Custom rules
// =============================================================================

#[test]
fn test_custom_shim_rule_takes_precedence() {
    let engine = engine(EngineVersion::new(3, 8, 4));
    let bridge = Bridge::builder(Arc::clone(&engine))
        .shim_rule(
            ShimRule::new(ErrorKind::UnsupportedFormat)
                .code(codes::NOT_SUPPORTED)
                .pattern("coordinate operations")
                .unwrap(),
        )
        .build()
        .unwrap();

    let wgs84 = bridge.spatial_reference("EPSG:4326").unwrap();
    let other = bridge.spatial_reference("EPSG:27700").unwrap();

    let err = bridge.coordinate_transformation(&wgs84, &other).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(err.native_code(), Some(codes::NOT_SUPPORTED));

    // Unrelated failures still use the built-in table.
    let err = bridge.open("/vsimem/data/missing.tif").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_invalid_custom_pattern_is_rejected() {
    let rule = ShimRule::new(ErrorKind::NotFound).pattern("[unclosed");
    assert!(rule.is_err());
}
