use super::{resource_handle, Geometry};
use crate::dispatch::{OperationFuture, PendingOperation};
use crate::error::ErrorRecord;
use crate::registry::{Handle, ResourceKind};

/// One vector feature.
///
/// Released on its own when closed, but unusable once its layer's dataset
/// has closed.
#[derive(Clone, Debug)]
pub struct Feature {
    handle: Handle,
    fid: u64,
}

resource_handle!(Feature);

impl Feature {
    pub(crate) fn from_handle(handle: Handle, fid: u64) -> Self {
        Self { handle, fid }
    }

    pub fn fid(&self) -> u64 {
        self.fid
    }

    fn geometry_op(&self) -> PendingOperation<Geometry> {
        self.handle.operation("feature.geometry", |ctx, d| {
            let geometry = ctx.engine().feature_geometry(d)?;
            // A clone: it outlives the feature and its dataset.
            let handle = ctx.register(ResourceKind::Geometry, geometry, None);
            Ok(Geometry::from_handle(handle))
        })
    }

    /// An independent copy of the feature's geometry.
    pub fn geometry(&self) -> Result<Geometry, ErrorRecord> {
        self.handle.call_sync(self.geometry_op())
    }

    pub fn geometry_async(&self) -> OperationFuture<Geometry> {
        self.handle.call_async(self.geometry_op())
    }
}
