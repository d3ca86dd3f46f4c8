//! Instrumented serialization counter.
//!
//! Every call into the in-memory engine enters the probe with the family of
//! native state it touches. Two calls active on the same family at once, or
//! any call overlapping a process-wide mutation, count as an overlap
//! violation. A correctly serialized bridge keeps the count at zero.

use std::collections::HashMap;

use parking_lot::Mutex;

/// The native state one call touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// Reads of process-wide state, or calls that create fresh objects.
    Shared,
    /// Everything reachable from one dataset, or one standalone object.
    Object(u64),
    /// Two standalone objects at once (geometry transform).
    Pair(u64, u64),
    /// Process-wide mutation. Overlaps with nothing.
    Exclusive,
}

#[derive(Debug, Default)]
struct ProbeState {
    active: HashMap<u64, usize>,
    total_active: usize,
    exclusive_active: usize,
    calls: u64,
    violations: u64,
    peak_concurrency: usize,
}

/// Snapshot of the probe counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub calls: u64,
    pub overlap_violations: u64,
    pub peak_concurrency: usize,
}

#[derive(Debug, Default)]
pub struct SerializationProbe {
    state: Mutex<ProbeState>,
}

/// Leaves the probe when dropped, including when the call unwinds.
pub struct ProbeGuard<'a> {
    probe: &'a SerializationProbe,
    family: Family,
}

impl SerializationProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self, family: Family) -> ProbeGuard<'_> {
        let mut state = self.state.lock();
        state.calls += 1;

        let mut overlap = state.exclusive_active > 0;
        match family {
            Family::Shared => {}
            Family::Object(key) => overlap |= bump(&mut state.active, key),
            Family::Pair(a, b) => {
                overlap |= bump(&mut state.active, a);
                if a != b {
                    overlap |= bump(&mut state.active, b);
                }
            }
            Family::Exclusive => {
                overlap |= state.total_active > 0;
                state.exclusive_active += 1;
            }
        }
        if overlap {
            state.violations += 1;
        }

        state.total_active += 1;
        state.peak_concurrency = state.peak_concurrency.max(state.total_active);
        ProbeGuard {
            probe: self,
            family,
        }
    }

    pub fn report(&self) -> ProbeReport {
        let state = self.state.lock();
        ProbeReport {
            calls: state.calls,
            overlap_violations: state.violations,
            peak_concurrency: state.peak_concurrency,
        }
    }

    fn leave(&self, family: Family) {
        let mut state = self.state.lock();
        state.total_active -= 1;
        match family {
            Family::Shared => {}
            Family::Object(key) => unbump(&mut state.active, key),
            Family::Pair(a, b) => {
                unbump(&mut state.active, a);
                if a != b {
                    unbump(&mut state.active, b);
                }
            }
            Family::Exclusive => state.exclusive_active -= 1,
        }
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        self.probe.leave(self.family);
    }
}

/// Returns true if the key was already active.
fn bump(active: &mut HashMap<u64, usize>, key: u64) -> bool {
    let count = active.entry(key).or_insert(0);
    *count += 1;
    *count > 1
}

fn unbump(active: &mut HashMap<u64, usize>, key: u64) {
    if let Some(count) = active.get_mut(&key) {
        *count -= 1;
        if *count == 0 {
            active.remove(&key);
        }
    }
}
