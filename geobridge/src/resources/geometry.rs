//! Standalone geometries.
//!
//! The core implements no geometry algorithm: every measure is a single
//! engine call under the geometry's own domain.

use super::{resource_handle, CoordinateTransformation};
use crate::dispatch::{OperationFuture, PendingOperation};
use crate::engine::GeometryMeasure;
use crate::error::ErrorRecord;
use crate::registry::{Handle, ResourceKind};

#[derive(Clone, Debug)]
pub struct Geometry {
    handle: Handle,
}

resource_handle!(Geometry);

impl Geometry {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    fn wkt_op(&self) -> PendingOperation<String> {
        self.handle
            .operation("geometry.wkt", |ctx, d| Ok(ctx.engine().geometry_wkt(d)?))
    }

    fn measure_op(&self, name: &'static str, measure: GeometryMeasure) -> PendingOperation<f64> {
        self.handle.operation(name, move |ctx, d| {
            Ok(ctx.engine().geometry_measure(d, measure)?)
        })
    }

    fn is_valid_op(&self) -> PendingOperation<bool> {
        self.handle.operation("geometry.is_valid", |ctx, d| {
            Ok(ctx.engine().geometry_is_valid(d)?)
        })
    }

    /// Locks both the geometry and the transformation.
    fn transform_op(
        &self,
        transformation: &CoordinateTransformation,
    ) -> Result<PendingOperation<Geometry>, ErrorRecord> {
        self.handle.ensure_same_bridge(transformation.handle())?;
        let geometry = self.handle.resource();
        let transformation = transformation.handle().resource();
        Ok(PendingOperation::on(
            "geometry.transform",
            &[&geometry, &transformation],
            move |ctx| {
                let source = ctx.resolve(&geometry)?;
                let ct = ctx.resolve(&transformation)?;
                let transformed = ctx.engine().transform_geometry(source, ct)?;
                let handle = ctx.register(ResourceKind::Geometry, transformed, None);
                Ok(Geometry::from_handle(handle))
            },
        ))
    }

    /// Well-known text.
    pub fn wkt(&self) -> Result<String, ErrorRecord> {
        self.handle.call_sync(self.wkt_op())
    }

    pub fn wkt_async(&self) -> OperationFuture<String> {
        self.handle.call_async(self.wkt_op())
    }

    pub fn area(&self) -> Result<f64, ErrorRecord> {
        self.handle
            .call_sync(self.measure_op("geometry.area", GeometryMeasure::Area))
    }

    pub fn area_async(&self) -> OperationFuture<f64> {
        self.handle
            .call_async(self.measure_op("geometry.area", GeometryMeasure::Area))
    }

    pub fn length(&self) -> Result<f64, ErrorRecord> {
        self.handle
            .call_sync(self.measure_op("geometry.length", GeometryMeasure::Length))
    }

    pub fn length_async(&self) -> OperationFuture<f64> {
        self.handle
            .call_async(self.measure_op("geometry.length", GeometryMeasure::Length))
    }

    pub fn is_geometry_valid(&self) -> Result<bool, ErrorRecord> {
        self.handle.call_sync(self.is_valid_op())
    }

    pub fn is_geometry_valid_async(&self) -> OperationFuture<bool> {
        self.handle.call_async(self.is_valid_op())
    }

    /// Returns a transformed copy. The original is left untouched.
    pub fn transform(
        &self,
        transformation: &CoordinateTransformation,
    ) -> Result<Geometry, ErrorRecord> {
        let op = self.transform_op(transformation)?;
        self.handle.call_sync(op)
    }

    pub fn transform_async(
        &self,
        transformation: &CoordinateTransformation,
    ) -> OperationFuture<Geometry> {
        match self.transform_op(transformation) {
            Ok(op) => self.handle.call_async(op),
            Err(err) => OperationFuture::ready(Err(err)),
        }
    }
}
