//! Handle Registry.
//!
//! Ties native descriptors to managed handles and enforces that a descriptor
//! is never reached after its resource, or any of its ancestors, has closed.
//!
//! # Architecture
//!
//! ```text
//! Handle ──Arc──► HandleInner { ResourceRef, Arc<BridgeCore> }
//!                        │
//!                        ▼ resolve / close
//!                 HandleRegistry (slot table)
//!                        │
//!                        ▼
//!                 NativeDescriptor
//! ```
//!
//! A [`Handle`] is reference counted. When the last clone of a still-open
//! handle is dropped, a close is scheduled with the finalizer; explicit
//! [`Handle::close`] releases the resource immediately.

mod handle;
#[allow(clippy::module_inception)]
mod registry;
mod resource;

pub use handle::{Handle, ResourceObserver};
pub use registry::{CloseOutcome, HandleRegistry};
pub use resource::{ResourceId, ResourceKind, ResourceRef};
