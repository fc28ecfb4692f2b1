//! Memo Implementation
//!
//! A memo is a derived value: a private cell plus a computation whose body
//! writes `compute()` into that cell.
//!
//! # How Memos Work
//!
//! 1. On creation the computation runs once, which both fills the cell and
//!    subscribes the memo to whatever `compute` read.
//!
//! 2. When one of those cells is written, the computation re-runs and writes
//!    the new result, which in turn notifies the memo's own subscribers.
//!
//! 3. Reading the memo only returns the cached value. Recomputation is
//!    driven by writes, never by reads.
//!
//! Because the dependencies are re-collected on every run, a memo with a
//! conditional read (`if flag { x } else { y }`) stops listening to the
//! branch it no longer takes.

use std::fmt;
use std::rc::Weak;

use super::runtime::{upgrade, RuntimeInner};
use super::signal::{CellId, ReadSignal};
use super::subscriber::ComputationId;
use crate::error::{ReactiveError, Result};

/// Read accessor of a derived value created by
/// [`Runtime::create_memo`](super::Runtime::create_memo).
///
/// The write side is private to the memo's computation.
pub struct Memo<T> {
    runtime: Weak<RuntimeInner>,
    value: ReadSignal<Option<T>>,
    computation: ComputationId,
}

impl<T: Clone + 'static> Memo<T> {
    pub(crate) fn new(
        runtime: Weak<RuntimeInner>,
        value: ReadSignal<Option<T>>,
        computation: ComputationId,
    ) -> Self {
        Self {
            runtime,
            value,
            computation,
        }
    }

    /// Id of the cell holding the memoized value.
    pub fn id(&self) -> CellId {
        self.value.id()
    }

    /// Id of the computation that keeps the value up to date.
    pub fn computation(&self) -> ComputationId {
        self.computation
    }

    /// Get the last committed value, subscribing the running computation.
    ///
    /// # Panics
    ///
    /// Panics if the memo was disposed, its runtime dropped, or its
    /// computation has never completed (the first run panicked).
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_get(&self) -> Result<T> {
        self.value
            .try_get()?
            .ok_or(ReactiveError::Uncomputed(self.value.id()))
    }

    pub fn get_untracked(&self) -> T {
        match self.try_get_untracked() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_get_untracked(&self) -> Result<T> {
        self.value
            .try_get_untracked()?
            .ok_or(ReactiveError::Uncomputed(self.value.id()))
    }

    pub fn subscriber_count(&self) -> usize {
        self.value.subscriber_count()
    }

    /// Dispose the computation and the cell. Readers see
    /// [`ReactiveError::CellDisposed`] afterwards.
    pub fn dispose(&self) {
        if let Ok(runtime) = upgrade(&self.runtime) {
            runtime.dispose_computation(self.computation);
            runtime.dispose_cell(self.value.id());
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.value.is_disposed()
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: Weak::clone(&self.runtime),
            value: self.value.clone(),
            computation: self.computation,
        }
    }
}

impl<T> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("cell", &self.value)
            .field("computation", &self.computation)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
