//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on reactive values: an
//! effect, or the computation that keeps a memo up to date.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::arena::ArenaKey;
use super::edges::DependencySet;

/// Handle to a computation owned by a [`Runtime`](super::Runtime).
///
/// Ids are only meaningful within the runtime that issued them. Once the
/// computation is disposed its id never resolves again, even if the slot
/// is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComputationId {
    index: u32,
    generation: u32,
}

impl ArenaKey for ComputationId {
    fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    fn slot(self) -> usize {
        self.index as usize
    }

    fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "computation#{}v{}", self.index, self.generation)
    }
}

/// What a computation was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputationKind {
    Effect,
    Memo,
}

/// Runtime-side record of a computation.
pub(crate) struct Computation {
    pub kind: ComputationKind,

    /// Shared so a run can invoke the body without holding the arena borrow.
    pub body: Rc<dyn Fn()>,

    /// Cells whose subscriber sets currently contain this computation.
    pub deps: DependencySet,

    /// Completed runs, including runs whose body panicked.
    pub run_count: usize,
}

impl Computation {
    pub fn new<F>(kind: ComputationKind, body: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            kind,
            body: Rc::new(body),
            deps: DependencySet::new(),
            run_count: 0,
        }
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("kind", &self.kind)
            .field("deps", &self.deps)
            .field("run_count", &self.run_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn ids_display_index_and_generation() {
        let id = ComputationId::from_parts(3, 1);
        assert_eq!(id.to_string(), "computation#3v1");
    }

    #[test]
    fn new_computation_has_no_deps() {
        let computation = Computation::new(ComputationKind::Effect, || {});
        assert!(computation.deps.is_empty());
        assert_eq!(computation.run_count, 0);
    }

    #[test]
    fn body_is_shared_not_copied() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();

        let computation = Computation::new(ComputationKind::Memo, move || {
            calls_clone.set(calls_clone.get() + 1);
        });

        let body = Rc::clone(&computation.body);
        body();
        (computation.body)();
        assert_eq!(calls.get(), 2);
    }
}
