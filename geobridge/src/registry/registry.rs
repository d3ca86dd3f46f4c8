//! Slot table mapping resource ids to native descriptors.

use parking_lot::Mutex;

use super::resource::{ResourceId, ResourceKind, ResourceRef};
use crate::engine::NativeDescriptor;
use crate::error::ErrorRecord;

/// Outcome of [`HandleRegistry::close`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The resource was already closed. Nothing to release.
    AlreadyClosed,
    /// The resource is now closed. `release` is the descriptor the caller must
    /// hand back to the engine, if any.
    Closed { release: Option<NativeDescriptor> },
}

#[derive(Debug)]
struct Entry {
    kind: ResourceKind,
    descriptor: NativeDescriptor,
    parent: Option<(ResourceId, ResourceKind)>,
    root: Option<ResourceId>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Debug, Default)]
struct RegistryState {
    slots: Vec<Slot>,
    free: Vec<u32>,
    open: usize,
}

impl RegistryState {
    fn entry(&self, id: ResourceId) -> Option<&Entry> {
        let slot = self.slots.get(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Walks the parent chain and returns the nearest closed ancestor's kind.
    fn closed_ancestor(&self, entry: &Entry) -> Option<ResourceKind> {
        let mut next = entry.parent;
        while let Some((id, kind)) = next {
            match self.entry(id) {
                Some(parent) => next = parent.parent,
                None => return Some(kind),
            }
        }
        None
    }
}

/// The Handle Registry.
///
/// Owns the mapping from resource ids to native descriptors. An id is open
/// while its slot holds an entry of the same generation; closing empties the
/// slot and bumps its generation, so every outstanding copy of the id goes
/// stale at once.
///
/// Parent links are stored as ids, never as handles, so a child cannot keep
/// its parent alive and closing a parent cannot leave a dangling reference.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    state: Mutex<RegistryState>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly created native object.
    pub fn register(
        &self,
        kind: ResourceKind,
        descriptor: NativeDescriptor,
        parent: Option<&ResourceRef>,
    ) -> ResourceRef {
        let mut state = self.state.lock();
        let slot = match state.free.pop() {
            Some(slot) => slot,
            None => {
                state.slots.push(Slot::default());
                (state.slots.len() - 1) as u32
            }
        };
        let generation = state.slots[slot as usize].generation;
        state.slots[slot as usize].entry = Some(Entry {
            kind,
            descriptor,
            parent: parent.map(|p| (p.id, p.kind)),
            root: parent.map(|p| p.root),
        });
        state.open += 1;

        let id = ResourceId::new(slot, generation);
        ResourceRef {
            id,
            kind,
            root: parent.map(|p| p.root).unwrap_or(id),
        }
    }

    /// Returns the descriptor of an open resource whose ancestors are all open.
    pub fn resolve(&self, resource: &ResourceRef) -> Result<NativeDescriptor, ErrorRecord> {
        let state = self.state.lock();
        let entry = state
            .entry(resource.id)
            .ok_or_else(|| ErrorRecord::resource_closed(resource.kind))?;
        if let Some(ancestor) = state.closed_ancestor(entry) {
            return Err(ErrorRecord::ancestor_closed(resource.kind, ancestor));
        }
        Ok(entry.descriptor)
    }

    /// Closes a resource. Idempotent.
    ///
    /// The registry never talks to the engine; the caller releases the returned
    /// descriptor while still holding the resource's lock domain. Parent-owned
    /// objects whose ancestor is already gone have nothing left to release.
    pub fn close(&self, resource: &ResourceRef) -> CloseOutcome {
        let mut state = self.state.lock();
        let Some(entry) = state.entry(resource.id) else {
            return CloseOutcome::AlreadyClosed;
        };
        let orphaned = state.closed_ancestor(entry).is_some();
        let release = if entry.kind.is_owned_by_parent() && orphaned {
            None
        } else {
            Some(entry.descriptor)
        };

        let slot = &mut state.slots[resource.id.slot() as usize];
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        state.free.push(resource.id.slot());
        state.open -= 1;

        CloseOutcome::Closed { release }
    }

    /// Returns true if the resource and all of its ancestors are open.
    pub fn is_valid(&self, resource: &ResourceRef) -> bool {
        self.resolve(resource).is_ok()
    }

    /// Returns true if the resource itself has not been closed yet, whatever
    /// the state of its ancestors.
    pub fn contains(&self, resource: &ResourceRef) -> bool {
        self.state.lock().entry(resource.id).is_some()
    }

    /// Number of resources not yet closed.
    pub fn open_count(&self) -> usize {
        self.state.lock().open
    }

    /// All resources not yet closed, most recently created slots first.
    pub fn snapshot(&self) -> Vec<ResourceRef> {
        let state = self.state.lock();
        let mut open: Vec<ResourceRef> = state
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| {
                let entry = s.entry.as_ref()?;
                let id = ResourceId::new(slot as u32, s.generation);
                Some((id, entry))
            })
            .map(|(id, entry)| ResourceRef {
                id,
                kind: entry.kind,
                root: entry.root.unwrap_or(id),
            })
            .collect();
        open.reverse();
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn desc(raw: u64) -> NativeDescriptor {
        NativeDescriptor::new(raw)
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = HandleRegistry::new();
        let ds = registry.register(ResourceKind::Dataset, desc(10), None);

        assert!(ds.is_root());
        assert_eq!(registry.resolve(&ds), Ok(desc(10)));
        assert!(registry.is_valid(&ds));
        assert_eq!(registry.open_count(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let registry = HandleRegistry::new();
        let ds = registry.register(ResourceKind::Dataset, desc(10), None);

        assert_eq!(
            registry.close(&ds),
            CloseOutcome::Closed {
                release: Some(desc(10))
            }
        );
        assert_eq!(registry.close(&ds), CloseOutcome::AlreadyClosed);
        assert_eq!(registry.open_count(), 0);

        let err = registry.resolve(&ds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceClosed);
    }

    #[test]
    fn test_child_invalid_after_parent_close() {
        let registry = HandleRegistry::new();
        let ds = registry.register(ResourceKind::Dataset, desc(1), None);
        let layer = registry.register(ResourceKind::Layer, desc(2), Some(&ds));
        let feature = registry.register(ResourceKind::Feature, desc(3), Some(&layer));

        assert_eq!(layer.root, ds.id);
        assert_eq!(feature.root, ds.id);

        registry.close(&ds);

        let err = registry.resolve(&feature).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceClosed);
        assert!(err.message().contains("parent Dataset"));
        assert!(!registry.is_valid(&layer));
        assert!(registry.contains(&layer));
    }

    #[test]
    fn test_orphaned_owned_child_is_not_released() {
        let registry = HandleRegistry::new();
        let ds = registry.register(ResourceKind::Dataset, desc(1), None);
        let layer = registry.register(ResourceKind::Layer, desc(2), Some(&ds));
        let feature = registry.register(ResourceKind::Feature, desc(3), Some(&layer));

        registry.close(&ds);

        assert_eq!(
            registry.close(&layer),
            CloseOutcome::Closed { release: None }
        );
        // Features are independently owned and still need releasing.
        assert_eq!(
            registry.close(&feature),
            CloseOutcome::Closed {
                release: Some(desc(3))
            }
        );
    }

    #[test]
    fn test_stale_id_never_aliases_reused_slot() {
        let registry = HandleRegistry::new();
        let first = registry.register(ResourceKind::Geometry, desc(1), None);
        registry.close(&first);

        let second = registry.register(ResourceKind::Geometry, desc(2), None);
        assert_eq!(first.id.slot(), second.id.slot());
        assert_ne!(first.id, second.id);

        assert!(registry.resolve(&first).is_err());
        assert_eq!(registry.resolve(&second), Ok(desc(2)));
        assert_eq!(registry.close(&first), CloseOutcome::AlreadyClosed);
        assert!(registry.is_valid(&second));
    }

    #[test]
    fn test_same_storage_opened_twice_is_two_resources() {
        let registry = HandleRegistry::new();
        let a = registry.register(ResourceKind::Dataset, desc(1), None);
        let b = registry.register(ResourceKind::Dataset, desc(2), None);

        registry.close(&a);
        assert!(!registry.is_valid(&a));
        assert!(registry.is_valid(&b));
    }

    #[test]
    fn test_snapshot_lists_open_resources_with_roots() {
        let registry = HandleRegistry::new();
        let ds = registry.register(ResourceKind::Dataset, desc(1), None);
        let band = registry.register(ResourceKind::RasterBand, desc(2), Some(&ds));
        let geom = registry.register(ResourceKind::Geometry, desc(3), None);
        registry.close(&geom);

        let open = registry.snapshot();
        assert_eq!(open, vec![band, ds]);
    }
}
