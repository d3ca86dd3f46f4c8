//! Lock Domain Manager.
//!
//! Serializes native calls that touch related resources or process-wide
//! engine state.
//!
//! # Domains
//!
//! - [`DomainId::Global`]: process-wide native state (configuration keys,
//!   driver registry). Every operation holds it; ordinary operations share it,
//!   configuration mutation takes it exclusively.
//! - [`DomainId::Resource`]: one per resource. An operation on a resource locks
//!   its own domain and the domain of its root ancestor, so closing a dataset
//!   cannot race a read on one of its layers.
//!
//! # Ordering
//!
//! A ticket enqueues into every domain of its scope in one atomic step and is
//! granted once no conflicting ticket is ahead of it in any of those queues.
//! Queue positions therefore follow a single global submission order, which
//! makes every domain FIFO and rules out cyclic waits.

mod manager;
mod ticket;

pub use manager::{DomainStats, LockDomainManager};
pub use ticket::DomainTicket;

use std::fmt;

use crate::registry::{ResourceId, ResourceRef};

/// A serialization unit.
///
/// Ordered with `Global` first, then resources by id. Scopes list their
/// domains in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DomainId {
    Global,
    Resource(ResourceId),
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Resource(id) => write!(f, "resource{}", id),
        }
    }
}

/// How a domain is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl LockMode {
    pub fn conflicts_with(self, other: LockMode) -> bool {
        self == LockMode::Exclusive || other == LockMode::Exclusive
    }
}

/// The set of domains one operation must hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockScope {
    entries: Vec<(DomainId, LockMode)>,
}

impl LockScope {
    /// Process-wide read: drivers, configuration lookup, open, file stat.
    pub fn global_shared() -> Self {
        Self {
            entries: vec![(DomainId::Global, LockMode::Shared)],
        }
    }

    /// Process-wide mutation: excludes every other operation.
    pub fn global_exclusive() -> Self {
        Self {
            entries: vec![(DomainId::Global, LockMode::Exclusive)],
        }
    }

    /// An operation on one or more resources: the global domain shared, and
    /// each resource's root and own domain exclusive.
    pub fn for_resources(resources: &[&ResourceRef]) -> Self {
        let mut scope = Self::global_shared();
        for resource in resources {
            scope.insert(DomainId::Resource(resource.root), LockMode::Exclusive);
            scope.insert(DomainId::Resource(resource.id), LockMode::Exclusive);
        }
        scope
    }

    /// Adds a domain, keeping the stronger mode on duplicates.
    pub fn insert(&mut self, domain: DomainId, mode: LockMode) {
        match self.entries.binary_search_by_key(&domain, |(d, _)| *d) {
            Ok(index) => {
                let held = &mut self.entries[index].1;
                *held = (*held).max(mode);
            }
            Err(index) => self.entries.insert(index, (domain, mode)),
        }
    }

    /// Domains in acquisition order.
    pub fn entries(&self) -> &[(DomainId, LockMode)] {
        &self.entries
    }

    pub fn mode_of(&self, domain: DomainId) -> Option<LockMode> {
        self.entries
            .binary_search_by_key(&domain, |(d, _)| *d)
            .ok()
            .map(|index| self.entries[index].1)
    }

    /// Returns true if the two scopes may not run at the same time.
    pub fn conflicts_with(&self, other: &LockScope) -> bool {
        self.entries.iter().any(|(domain, mode)| {
            other
                .mode_of(*domain)
                .is_some_and(|theirs| mode.conflicts_with(theirs))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{HandleRegistry, ResourceKind};
    use crate::engine::NativeDescriptor;

    #[test]
    fn test_global_is_ordered_first() {
        let registry = HandleRegistry::new();
        let ds = registry.register(ResourceKind::Dataset, NativeDescriptor::new(1), None);
        let scope = LockScope::for_resources(&[&ds]);

        assert_eq!(scope.entries()[0], (DomainId::Global, LockMode::Shared));
        assert_eq!(scope.entries().len(), 2);
    }

    #[test]
    fn test_child_scope_includes_root() {
        let registry = HandleRegistry::new();
        let ds = registry.register(ResourceKind::Dataset, NativeDescriptor::new(1), None);
        let layer = registry.register(ResourceKind::Layer, NativeDescriptor::new(2), Some(&ds));
        let feature =
            registry.register(ResourceKind::Feature, NativeDescriptor::new(3), Some(&layer));

        let scope = LockScope::for_resources(&[&feature]);
        assert_eq!(
            scope.mode_of(DomainId::Resource(ds.id)),
            Some(LockMode::Exclusive)
        );
        assert_eq!(
            scope.mode_of(DomainId::Resource(feature.id)),
            Some(LockMode::Exclusive)
        );
        assert_eq!(scope.mode_of(DomainId::Resource(layer.id)), None);

        // Closing the dataset conflicts with a read on its feature.
        assert!(LockScope::for_resources(&[&ds]).conflicts_with(&scope));
    }

    #[test]
    fn test_unrelated_resources_do_not_conflict() {
        let registry = HandleRegistry::new();
        let a = registry.register(ResourceKind::Geometry, NativeDescriptor::new(1), None);
        let b = registry.register(ResourceKind::Geometry, NativeDescriptor::new(2), None);

        let sa = LockScope::for_resources(&[&a]);
        let sb = LockScope::for_resources(&[&b]);
        assert!(!sa.conflicts_with(&sb));
        assert!(!LockScope::global_shared().conflicts_with(&sa));
        assert!(LockScope::global_exclusive().conflicts_with(&sa));
        assert!(LockScope::global_exclusive().conflicts_with(&LockScope::global_shared()));
    }

    #[test]
    fn test_insert_keeps_stronger_mode() {
        let mut scope = LockScope::global_shared();
        scope.insert(DomainId::Global, LockMode::Exclusive);
        scope.insert(DomainId::Global, LockMode::Shared);
        assert_eq!(scope.mode_of(DomainId::Global), Some(LockMode::Exclusive));
        assert_eq!(scope.entries().len(), 1);
    }
}
