//! Dependency edges.
//!
//! Every edge is stored twice: the cell's [`SubscriberSet`] names the
//! computation, and the computation's [`DependencySet`] names the cell.
//! Both sides hold ids, never owning references. Links are only created by
//! [`link`] and removed by [`unlink_all`] (before a re-run or on dispose)
//! or by disposing the cell.

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::trace;

use super::arena::Arena;
use super::signal::{CellId, CellSlot};
use super::subscriber::ComputationId;

/// Computations subscribed to one cell, in subscription order.
#[derive(Debug, Clone, Default)]
pub(crate) struct SubscriberSet {
    members: IndexSet<ComputationId>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, computation: ComputationId) -> bool {
        self.members.insert(computation)
    }

    pub fn remove(&mut self, computation: ComputationId) -> bool {
        self.members.shift_remove(&computation)
    }

    #[cfg(test)]
    pub fn contains(&self, computation: ComputationId) -> bool {
        self.members.contains(&computation)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ComputationId> + '_ {
        self.members.iter().copied()
    }

    /// Copy of the current members. Notification iterates over this so the
    /// runs it triggers may freely relink the live set.
    pub fn snapshot(&self) -> Vec<ComputationId> {
        self.members.iter().copied().collect()
    }
}

/// Cells one computation read during its current run.
#[derive(Debug, Clone, Default)]
pub(crate) struct DependencySet {
    cells: SmallVec<[CellId; 4]>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the cell was already present.
    pub fn insert(&mut self, cell: CellId) -> bool {
        if self.cells.contains(&cell) {
            return false;
        }
        self.cells.push(cell);
        true
    }

    pub fn remove(&mut self, cell: CellId) -> bool {
        match self.cells.iter().position(|c| *c == cell) {
            Some(position) => {
                self.cells.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.iter().copied()
    }

    /// Empty the set, returning what it held.
    pub fn take(&mut self) -> DependencySet {
        std::mem::take(self)
    }
}

impl IntoIterator for DependencySet {
    type Item = CellId;
    type IntoIter = smallvec::IntoIter<[CellId; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

/// Record that `reader` read `cell`.
pub(crate) fn link(
    subscribers: &mut SubscriberSet,
    deps: &mut DependencySet,
    cell: CellId,
    reader: ComputationId,
) {
    let added = subscribers.insert(reader);
    deps.insert(cell);
    if added {
        trace!(%cell, computation = %reader, "linked");
    }
}

/// Remove `computation` from the subscriber set of every cell in `deps`.
///
/// Cells disposed in the meantime are skipped.
pub(crate) fn unlink_all(
    cells: &mut Arena<CellId, CellSlot>,
    computation: ComputationId,
    deps: DependencySet,
) {
    if deps.is_empty() {
        return;
    }
    trace!(%computation, count = deps.len(), "tearing down dependencies");
    for cell in deps {
        if let Some(slot) = cells.get_mut(cell) {
            slot.subscribers.remove(computation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::arena::ArenaKey;

    fn computation(index: u32) -> ComputationId {
        ComputationId::from_parts(index, 0)
    }

    #[test]
    fn subscriber_set_keeps_subscription_order() {
        let mut set = SubscriberSet::new();
        set.insert(computation(5));
        set.insert(computation(1));
        set.insert(computation(3));
        set.remove(computation(1));
        set.insert(computation(1));

        assert_eq!(
            set.snapshot(),
            vec![computation(5), computation(3), computation(1)]
        );
    }

    #[test]
    fn subscriber_set_ignores_duplicates() {
        let mut set = SubscriberSet::new();
        assert!(set.insert(computation(0)));
        assert!(!set.insert(computation(0)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn link_then_unlink_clears_both_sides() {
        let mut cells: Arena<CellId, CellSlot> = Arena::new();
        let a = cells.insert(CellSlot::new(1_i32));
        let b = cells.insert(CellSlot::new("b"));
        let reader = computation(0);
        let mut deps = DependencySet::new();

        for cell in [a, b, a] {
            let slot = cells.get_mut(cell).unwrap();
            link(&mut slot.subscribers, &mut deps, cell, reader);
        }

        assert_eq!(deps.len(), 2);
        assert!(cells.get(a).unwrap().subscribers.contains(reader));
        assert!(cells.get(b).unwrap().subscribers.contains(reader));

        let stale = deps.take();
        assert!(deps.is_empty());
        unlink_all(&mut cells, reader, stale);

        assert_eq!(cells.get(a).unwrap().subscribers.len(), 0);
        assert_eq!(cells.get(b).unwrap().subscribers.len(), 0);
    }

    #[test]
    fn unlink_skips_removed_cells() {
        let mut cells: Arena<CellId, CellSlot> = Arena::new();
        let a = cells.insert(CellSlot::new(0_u8));
        let reader = computation(2);
        let mut deps = DependencySet::new();
        link(&mut cells.get_mut(a).unwrap().subscribers, &mut deps, a, reader);

        cells.remove(a);
        unlink_all(&mut cells, reader, deps);
        assert_eq!(cells.len(), 0);
    }
}
