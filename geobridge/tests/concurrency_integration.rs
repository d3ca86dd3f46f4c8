//! Integration tests for serialization and ordering.
//!
//! These tests verify that:
//! - Related native calls never overlap, measured by the engine's probe
//! - Completions on one domain follow submission order across call styles
//! - The worker pool never exceeds its capacity
//! - Process-wide configuration changes run alone

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use geobridge::engine::memory::{BandSpec, DatasetSpec, LayerSpec, MemoryEngine, MemoryFile};
use geobridge::{Bridge, ErrorKind};

// =============================================================================
// Test Helpers
// =============================================================================

fn engine_with_datasets(count: usize) -> Arc<MemoryEngine> {
    let engine = MemoryEngine::new();
    for i in 0..count {
        engine.add_file(
            &format!("/vsimem/tiles/{i}.tif"),
            MemoryFile::Dataset(DatasetSpec::raster("GTiff", 256, 256).with_band(BandSpec::new("Byte"))),
        );
    }
    engine.add_file(
        "/vsimem/roads.geojson",
        MemoryFile::Dataset(
            DatasetSpec::vector("GeoJSON").with_layer(
                LayerSpec::new("roads", "LineString")
                    .with_feature(1, "LINESTRING (0 0,1 1)")
                    .with_feature(2, "LINESTRING (1 1,2 2)"),
            ),
        ),
    );
    Arc::new(engine)
}

fn bridge(engine: &Arc<MemoryEngine>, workers: usize) -> Bridge {
    Bridge::builder(Arc::clone(engine))
        .workers(workers)
        .build()
        .expect("bridge should start")
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_sync_close_waits_for_queued_async_reads() {
    let engine = engine_with_datasets(1);
    engine.set_latency(Duration::from_millis(5));
    let bridge = bridge(&engine, 4);
    let dataset = bridge.open("/vsimem/tiles/0.tif").unwrap();

    let reads: Vec<_> = (0..3).map(|_| dataset.raster_size_async()).collect();
    dataset.close().unwrap();

    // Every read was settled before the close returned, and all succeeded.
    for read in reads {
        let size = read.now_or_never().expect("read settled before close").unwrap();
        assert_eq!(size.width, 256);
    }

    // Anything submitted after the close sees it.
    let err = futures::executor::block_on(dataset.raster_size_async()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceClosed);
    assert_eq!(engine.probe_report().overlap_violations, 0);
}

#[tokio::test]
async fn test_async_close_orders_after_reads() {
    let engine = engine_with_datasets(1);
    engine.set_latency(Duration::from_millis(2));
    let bridge = bridge(&engine, 4);
    let dataset = bridge.open("/vsimem/tiles/0.tif").unwrap();

    let before = dataset.raster_count_async();
    let close = dataset.close_async();
    let after = dataset.raster_count_async();

    assert_eq!(before.await, Ok(1));
    close.await.unwrap();
    assert_eq!(after.await.unwrap_err().kind(), ErrorKind::ResourceClosed);
}

#[test]
fn test_child_read_serialized_with_parent_close() {
    let engine = engine_with_datasets(0);
    engine.set_latency(Duration::from_millis(2));
    let bridge = bridge(&engine, 4);
    let dataset = bridge.open("/vsimem/roads.geojson").unwrap();
    let layer = dataset.layer(0).unwrap();

    let reads: Vec<_> = (0..8).map(|_| layer.features_async()).collect();
    dataset.close().unwrap();

    for read in reads {
        assert_eq!(read.now_or_never().expect("settled").unwrap().len(), 2);
    }
    assert_eq!(engine.probe_report().overlap_violations, 0);
    drop(bridge);
    assert_eq!(engine.invalid_release_count(), 0);
}

// =============================================================================
// Serialization
// =============================================================================

#[tokio::test]
async fn test_no_overlap_under_mixed_load() {
    let engine = engine_with_datasets(4);
    engine.set_latency(Duration::from_millis(1));
    let bridge = Arc::new(bridge(&engine, 8));

    let datasets: Vec<_> = (0..4)
        .map(|i| bridge.open(&format!("/vsimem/tiles/{i}.tif")).unwrap())
        .collect();

    let mut pending = Vec::new();
    for round in 0..10 {
        for dataset in &datasets {
            pending.push(dataset.raster_size_async().map(|r| r.map(|_| ())).boxed());
            pending.push(dataset.band_async(1).map(|r| r.map(|_| ())).boxed());
        }
        if round % 3 == 0 {
            pending.push(bridge.set_config_option_async("ROUND", Some("x")).boxed());
        }
    }

    // Blocking calls from other threads interleave with the async load.
    let workers: Vec<_> = datasets
        .iter()
        .cloned()
        .map(|dataset| {
            thread::spawn(move || {
                for _ in 0..5 {
                    dataset.raster_count().unwrap();
                }
            })
        })
        .collect();

    for result in join_all(pending).await {
        result.unwrap();
    }
    for worker in workers {
        worker.join().unwrap();
    }

    let report = engine.probe_report();
    assert_eq!(report.overlap_violations, 0);
    assert!(report.peak_concurrency > 1, "independent datasets should run in parallel");
}

#[test]
fn test_config_change_runs_alone() {
    let engine = engine_with_datasets(4);
    engine.set_latency(Duration::from_millis(3));
    let bridge = bridge(&engine, 4);

    let datasets: Vec<_> = (0..4)
        .map(|i| bridge.open(&format!("/vsimem/tiles/{i}.tif")).unwrap())
        .collect();
    let reads: Vec<_> = datasets.iter().map(|d| d.raster_size_async()).collect();

    bridge.set_config_option("GDAL_CACHEMAX", Some("64")).unwrap();

    // Reads queued ahead of the change finished before it started.
    for read in reads {
        assert!(read.now_or_never().expect("settled").is_ok());
    }
    assert_eq!(engine.probe_report().overlap_violations, 0);
    assert_eq!(
        bridge.config_option("GDAL_CACHEMAX").unwrap(),
        Some("64".to_string())
    );
}

// =============================================================================
// Pool bounds
// =============================================================================

#[tokio::test]
async fn test_pool_never_exceeds_capacity() {
    let engine = engine_with_datasets(16);
    engine.set_latency(Duration::from_millis(2));
    let bridge = bridge(&engine, 3);

    let opens: Vec<_> = (0..16)
        .map(|i| bridge.open_async(&format!("/vsimem/tiles/{i}.tif")))
        .collect();
    let datasets: Vec<_> = join_all(opens)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    let reads: Vec<_> = datasets.iter().map(|d| d.raster_size_async()).collect();
    for read in join_all(reads).await {
        read.unwrap();
    }

    let stats = bridge.stats().pool;
    assert_eq!(stats.capacity, 3);
    assert!(stats.peak_in_flight <= 3);
    assert!(stats.peak_in_flight >= 1);
    assert_eq!(stats.completed, 32);
    assert_eq!(stats.in_flight, 0);
}
