//! Spatial references and coordinate transformations.

use super::resource_handle;
use crate::dispatch::{OperationFuture, PendingOperation};
use crate::error::ErrorRecord;
use crate::registry::{Handle, ResourceId};

/// A coordinate reference system.
#[derive(Clone, Debug)]
pub struct SpatialReference {
    handle: Handle,
}

resource_handle!(SpatialReference);

impl SpatialReference {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    fn wkt_op(&self) -> PendingOperation<String> {
        self.handle
            .operation("srs.wkt", |ctx, d| Ok(ctx.engine().srs_wkt(d)?))
    }

    fn authority_code_op(&self) -> PendingOperation<Option<String>> {
        self.handle.operation("srs.authority_code", |ctx, d| {
            Ok(ctx.engine().srs_authority_code(d)?)
        })
    }

    pub fn wkt(&self) -> Result<String, ErrorRecord> {
        self.handle.call_sync(self.wkt_op())
    }

    pub fn wkt_async(&self) -> OperationFuture<String> {
        self.handle.call_async(self.wkt_op())
    }

    /// `AUTHORITY:CODE`, e.g. `EPSG:4326`, when the engine knows one.
    pub fn authority_code(&self) -> Result<Option<String>, ErrorRecord> {
        self.handle.call_sync(self.authority_code_op())
    }

    pub fn authority_code_async(&self) -> OperationFuture<Option<String>> {
        self.handle.call_async(self.authority_code_op())
    }
}

/// A transformation between two spatial references.
///
/// The native object captures both references when it is created, so it
/// stays usable after either of them closes.
#[derive(Clone, Debug)]
pub struct CoordinateTransformation {
    handle: Handle,
    source: ResourceId,
    target: ResourceId,
}

resource_handle!(CoordinateTransformation);

impl CoordinateTransformation {
    pub(crate) fn from_handle(handle: Handle, source: ResourceId, target: ResourceId) -> Self {
        Self {
            handle,
            source,
            target,
        }
    }

    /// Id of the source reference at creation time.
    pub fn source(&self) -> ResourceId {
        self.source
    }

    pub fn target(&self) -> ResourceId {
        self.target
    }
}
