//! Opened datasets.

use super::{resource_handle, Layer, RasterBand};
use crate::dispatch::{OperationFuture, PendingOperation};
use crate::engine::{LayerSelector, RasterSize};
use crate::error::ErrorRecord;
use crate::registry::{Handle, ResourceKind};

/// An opened raster or vector dataset.
///
/// The root of a lock domain: every band, layer and feature opened under it
/// is serialized against it, and none of them stays usable after it closes.
#[derive(Clone, Debug)]
pub struct Dataset {
    handle: Handle,
}

resource_handle!(Dataset);

impl Dataset {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    fn raster_size_op(&self) -> PendingOperation<RasterSize> {
        self.handle
            .operation("dataset.raster_size", |ctx, d| Ok(ctx.engine().raster_size(d)?))
    }

    fn raster_count_op(&self) -> PendingOperation<usize> {
        self.handle
            .operation("dataset.raster_count", |ctx, d| Ok(ctx.engine().raster_count(d)?))
    }

    fn band_op(&self, index: usize) -> PendingOperation<RasterBand> {
        let parent = self.handle.resource();
        self.handle.operation("dataset.band", move |ctx, d| {
            let band = ctx.engine().band(d, index)?;
            let handle = ctx.register(ResourceKind::RasterBand, band, Some(&parent));
            Ok(RasterBand::from_handle(handle, index))
        })
    }

    fn layer_count_op(&self) -> PendingOperation<usize> {
        self.handle
            .operation("dataset.layer_count", |ctx, d| Ok(ctx.engine().layer_count(d)?))
    }

    fn layer_op(&self, selector: LayerSelector) -> PendingOperation<Layer> {
        let parent = self.handle.resource();
        self.handle.operation("dataset.layer", move |ctx, d| {
            let layer = ctx.engine().layer(d, &selector)?;
            let handle = ctx.register(ResourceKind::Layer, layer, Some(&parent));
            Ok(Layer::from_handle(handle))
        })
    }

    fn driver_name_op(&self) -> PendingOperation<String> {
        self.handle
            .operation("dataset.driver_name", |ctx, d| Ok(ctx.engine().driver_name(d)?))
    }

    fn description_op(&self) -> PendingOperation<String> {
        self.handle
            .operation("dataset.description", |ctx, d| Ok(ctx.engine().description(d)?))
    }

    // -------------------------------------------------------------------------
    // Raster access
    // -------------------------------------------------------------------------

    /// Raster dimensions in pixels. Vector-only datasets report zero.
    pub fn raster_size(&self) -> Result<RasterSize, ErrorRecord> {
        self.handle.call_sync(self.raster_size_op())
    }

    pub fn raster_size_async(&self) -> OperationFuture<RasterSize> {
        self.handle.call_async(self.raster_size_op())
    }

    pub fn raster_count(&self) -> Result<usize, ErrorRecord> {
        self.handle.call_sync(self.raster_count_op())
    }

    pub fn raster_count_async(&self) -> OperationFuture<usize> {
        self.handle.call_async(self.raster_count_op())
    }

    /// Returns a band by 1-based index.
    ///
    /// The band is owned by this dataset and becomes invalid when it closes.
    pub fn band(&self, index: usize) -> Result<RasterBand, ErrorRecord> {
        self.handle.call_sync(self.band_op(index))
    }

    pub fn band_async(&self, index: usize) -> OperationFuture<RasterBand> {
        self.handle.call_async(self.band_op(index))
    }

    // -------------------------------------------------------------------------
    // Vector access
    // -------------------------------------------------------------------------

    pub fn layer_count(&self) -> Result<usize, ErrorRecord> {
        self.handle.call_sync(self.layer_count_op())
    }

    pub fn layer_count_async(&self) -> OperationFuture<usize> {
        self.handle.call_async(self.layer_count_op())
    }

    /// Returns a layer by 0-based index.
    pub fn layer(&self, index: usize) -> Result<Layer, ErrorRecord> {
        self.handle.call_sync(self.layer_op(LayerSelector::Index(index)))
    }

    pub fn layer_async(&self, index: usize) -> OperationFuture<Layer> {
        self.handle.call_async(self.layer_op(LayerSelector::Index(index)))
    }

    pub fn layer_by_name(&self, name: &str) -> Result<Layer, ErrorRecord> {
        self.handle
            .call_sync(self.layer_op(LayerSelector::Name(name.to_string())))
    }

    pub fn layer_by_name_async(&self, name: &str) -> OperationFuture<Layer> {
        self.handle
            .call_async(self.layer_op(LayerSelector::Name(name.to_string())))
    }

    // -------------------------------------------------------------------------
    // Metadata
    // -------------------------------------------------------------------------

    /// Short name of the driver that opened the dataset.
    pub fn driver_name(&self) -> Result<String, ErrorRecord> {
        self.handle.call_sync(self.driver_name_op())
    }

    pub fn driver_name_async(&self) -> OperationFuture<String> {
        self.handle.call_async(self.driver_name_op())
    }

    /// The path the dataset was opened from.
    pub fn description(&self) -> Result<String, ErrorRecord> {
        self.handle.call_sync(self.description_op())
    }

    pub fn description_async(&self) -> OperationFuture<String> {
        self.handle.call_async(self.description_op())
    }
}
