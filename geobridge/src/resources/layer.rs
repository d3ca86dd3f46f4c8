//! Vector layers.

use super::{resource_handle, Feature};
use crate::dispatch::{OperationFuture, PendingOperation};
use crate::engine::LayerInfo;
use crate::error::ErrorRecord;
use crate::registry::{Handle, ResourceKind};

/// A vector layer, owned by its dataset.
#[derive(Clone, Debug)]
pub struct Layer {
    handle: Handle,
}

resource_handle!(Layer);

impl Layer {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    fn info_op(&self) -> PendingOperation<LayerInfo> {
        self.handle
            .operation("layer.info", |ctx, d| Ok(ctx.engine().layer_info(d)?))
    }

    fn feature_op(&self, fid: u64) -> PendingOperation<Feature> {
        let parent = self.handle.resource();
        self.handle.operation("layer.feature", move |ctx, d| {
            let feature = ctx.engine().feature(d, fid)?;
            let handle = ctx.register(ResourceKind::Feature, feature, Some(&parent));
            Ok(Feature::from_handle(handle, fid))
        })
    }

    fn features_op(&self) -> PendingOperation<Vec<Feature>> {
        let parent = self.handle.resource();
        self.handle.operation("layer.features", move |ctx, d| {
            let fids = ctx.engine().feature_ids(d)?;
            let mut features = Vec::with_capacity(fids.len());
            for fid in fids {
                let feature = ctx.engine().feature(d, fid)?;
                let handle = ctx.register(ResourceKind::Feature, feature, Some(&parent));
                features.push(Feature::from_handle(handle, fid));
            }
            Ok(features)
        })
    }

    /// Name, feature count and geometry type.
    pub fn info(&self) -> Result<LayerInfo, ErrorRecord> {
        self.handle.call_sync(self.info_op())
    }

    pub fn info_async(&self) -> OperationFuture<LayerInfo> {
        self.handle.call_async(self.info_op())
    }

    /// Fetches one feature by id.
    pub fn feature(&self, fid: u64) -> Result<Feature, ErrorRecord> {
        self.handle.call_sync(self.feature_op(fid))
    }

    pub fn feature_async(&self, fid: u64) -> OperationFuture<Feature> {
        self.handle.call_async(self.feature_op(fid))
    }

    /// Every feature of the layer, in iteration order.
    ///
    /// Fetched under one acquisition of the layer's domains, so a concurrent
    /// close of the dataset either precedes or follows the whole read.
    pub fn features(&self) -> Result<Vec<Feature>, ErrorRecord> {
        self.handle.call_sync(self.features_op())
    }

    pub fn features_async(&self) -> OperationFuture<Vec<Feature>> {
        self.handle.call_async(self.features_op())
    }
}
