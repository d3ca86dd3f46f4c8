//! Typed handles.
//!
//! Each resource kind gets a thin wrapper around a [`Handle`] exposing the
//! operations that make sense for it. Every operation comes in two forms that
//! share one [`PendingOperation`](crate::dispatch::PendingOperation): a
//! blocking method and an `_async` method returning an
//! [`OperationFuture`](crate::OperationFuture) that settles with the same
//! value or the same [`ErrorRecord`](crate::ErrorRecord).
//!
//! # Ownership
//!
//! Children refer to their parent by id only. Keeping a `Layer` does not keep
//! its `Dataset` open; once the dataset closes, every operation on the layer
//! fails with `ResourceClosed`.

mod band;
mod dataset;
mod feature;
mod geometry;
mod layer;
mod srs;

pub use band::RasterBand;
pub use dataset::Dataset;
pub use feature::Feature;
pub use geometry::Geometry;
pub use layer::Layer;
pub use srs::{CoordinateTransformation, SpatialReference};

/// Generates the lifecycle methods every typed handle shares.
macro_rules! resource_handle {
    ($name:ident) => {
        impl $name {
            /// The underlying untyped handle.
            pub fn handle(&self) -> &$crate::registry::Handle {
                &self.handle
            }

            pub fn id(&self) -> $crate::registry::ResourceId {
                self.handle.id()
            }

            pub fn kind(&self) -> $crate::registry::ResourceKind {
                self.handle.kind()
            }

            /// Returns true if neither this resource nor any ancestor is closed.
            pub fn is_valid(&self) -> bool {
                self.handle.is_valid()
            }

            /// Releases the native resource. Closing twice is not an error.
            pub fn close(&self) -> Result<(), $crate::error::ErrorRecord> {
                self.handle.close()
            }

            pub fn close_async(&self) -> $crate::dispatch::OperationFuture<()> {
                self.handle.close_async()
            }

            /// Observes the resource without keeping it alive.
            pub fn downgrade(&self) -> $crate::registry::ResourceObserver {
                self.handle.downgrade()
            }
        }

        impl AsRef<$crate::registry::Handle> for $name {
            fn as_ref(&self) -> &$crate::registry::Handle {
                &self.handle
            }
        }
    };
}

pub(crate) use resource_handle;
