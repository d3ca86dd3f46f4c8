//! Resource identity.

use std::fmt;

/// The kinds of native objects reachable through the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Dataset,
    Layer,
    RasterBand,
    Feature,
    Geometry,
    SpatialReference,
    CoordinateTransformation,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dataset => "Dataset",
            Self::Layer => "Layer",
            Self::RasterBand => "RasterBand",
            Self::Feature => "Feature",
            Self::Geometry => "Geometry",
            Self::SpatialReference => "SpatialReference",
            Self::CoordinateTransformation => "CoordinateTransformation",
        }
    }

    /// Returns true if the native object is owned by its parent.
    ///
    /// Such objects are never released on their own once the parent is gone;
    /// the engine frees them together with the parent.
    pub fn is_owned_by_parent(&self) -> bool {
        matches!(self, Self::Layer | Self::RasterBand)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry slot index plus the slot's generation at registration time.
///
/// Slots are reused after close; the generation makes every id unique for
/// the lifetime of the registry, so a stale id never aliases a newer resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    slot: u32,
    generation: u32,
}

impl ResourceId {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.slot, self.generation)
    }
}

/// Everything a handle needs to find its resource again.
///
/// `root` is the id of the top-most ancestor (the resource itself when it has
/// no parent). Lock scopes are derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub root: ResourceId,
}

impl ResourceRef {
    pub fn is_root(&self) -> bool {
        self.id == self.root
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_by_parent() {
        assert!(ResourceKind::Layer.is_owned_by_parent());
        assert!(ResourceKind::RasterBand.is_owned_by_parent());
        assert!(!ResourceKind::Feature.is_owned_by_parent());
        assert!(!ResourceKind::Dataset.is_owned_by_parent());
        assert!(!ResourceKind::Geometry.is_owned_by_parent());
    }

    #[test]
    fn test_id_ordering_and_display() {
        let a = ResourceId::new(1, 0);
        let b = ResourceId::new(1, 1);
        let c = ResourceId::new(2, 0);
        assert!(a < b && b < c);
        assert_eq!(b.to_string(), "#1.1");
    }

    #[test]
    fn test_ref_display() {
        let id = ResourceId::new(3, 2);
        let r = ResourceRef {
            id,
            kind: ResourceKind::Dataset,
            root: id,
        };
        assert!(r.is_root());
        assert_eq!(r.to_string(), "Dataset#3.2");
    }
}
