use super::resource_handle;
use crate::dispatch::{OperationFuture, PendingOperation};
use crate::engine::BandInfo;
use crate::error::ErrorRecord;
use crate::registry::Handle;

/// One band of a raster dataset, owned by the dataset.
#[derive(Clone, Debug)]
pub struct RasterBand {
    handle: Handle,
    index: usize,
}

resource_handle!(RasterBand);

impl RasterBand {
    pub(crate) fn from_handle(handle: Handle, index: usize) -> Self {
        Self { handle, index }
    }

    /// The 1-based index this band was fetched with.
    pub fn index(&self) -> usize {
        self.index
    }

    fn info_op(&self) -> PendingOperation<BandInfo> {
        self.handle
            .operation("band.info", |ctx, d| Ok(ctx.engine().band_info(d)?))
    }

    /// Size, data type name and no-data value.
    pub fn info(&self) -> Result<BandInfo, ErrorRecord> {
        self.handle.call_sync(self.info_op())
    }

    pub fn info_async(&self) -> OperationFuture<BandInfo> {
        self.handle.call_async(self.info_op())
    }
}
