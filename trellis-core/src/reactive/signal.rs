//! Signal Implementation
//!
//! A signal is the fundamental reactive primitive: a cell holding a value
//! plus the set of computations that read it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while a computation is running, the cell
//!    records that computation as a subscriber and the computation records
//!    the cell as a dependency.
//!
//! 2. When a signal is written, the new value is stored unconditionally
//!    (there is no equality check) and every current subscriber is re-run.
//!
//! 3. The subscriber list is copied before the first re-run, so re-runs
//!    that relink the cell cannot disturb the notification in progress.
//!
//! # Handles
//!
//! [`Runtime::create_state`](super::Runtime::create_state) returns a
//! [`ReadSignal`] and a [`WriteSignal`]. Both are cheap to clone and refer to
//! the same cell. They hold a weak reference to the runtime: the runtime,
//! not the handles, owns the value.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Weak;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::arena::ArenaKey;
use super::edges::{self, SubscriberSet};
use super::runtime::{upgrade, RuntimeInner};
use crate::action::Action;
use crate::error::{ReactiveError, Result};

/// Handle to a cell owned by a [`Runtime`](super::Runtime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId {
    index: u32,
    generation: u32,
}

impl ArenaKey for CellId {
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

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}v{}", self.index, self.generation)
    }
}

/// Runtime-side storage for one cell.
pub(crate) struct CellSlot {
    pub value: Box<dyn Any>,
    pub subscribers: SubscriberSet,
}

impl CellSlot {
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            value: Box::new(value),
            subscribers: SubscriberSet::new(),
        }
    }
}

impl fmt::Debug for CellSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellSlot")
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

impl RuntimeInner {
    /// Credit a read of `cell` to the computation on top of the stack.
    pub(crate) fn track(&self, cell: CellId) {
        let Some(reader) = self.stack.borrow().current() else {
            return;
        };

        let mut computations = self.computations.borrow_mut();
        // The reader may have been disposed by its own body.
        let Some(computation) = computations.get_mut(reader) else {
            return;
        };
        let mut cells = self.cells.borrow_mut();
        let Some(slot) = cells.get_mut(cell) else {
            return;
        };

        edges::link(&mut slot.subscribers, &mut computation.deps, cell, reader);
    }

    /// Clone the current value without tracking.
    pub(crate) fn peek_cell<T: Clone + 'static>(&self, cell: CellId) -> Result<T> {
        let cells = self.cells.borrow();
        let slot = cells.get(cell).ok_or(ReactiveError::CellDisposed(cell))?;
        slot.value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(ReactiveError::TypeMismatch(cell))
    }

    pub(crate) fn read_cell<T: Clone + 'static>(&self, cell: CellId) -> Result<T> {
        let value = self.peek_cell(cell)?;
        self.track(cell);
        Ok(value)
    }

    /// Store the result of `action` and notify every current subscriber.
    pub(crate) fn write_cell<T: Clone + 'static>(&self, cell: CellId, action: Action<T>) -> Result<()> {
        let next = match action {
            Action::SetValue(value) => {
                let cells = self.cells.borrow();
                let slot = cells.get(cell).ok_or(ReactiveError::CellDisposed(cell))?;
                if !slot.value.is::<T>() {
                    return Err(ReactiveError::TypeMismatch(cell));
                }
                value
            }
            // The update function runs without any borrow held, so it may
            // read other cells.
            Action::UpdateFn(f) => f(&self.peek_cell::<T>(cell)?),
        };

        let subscribers = {
            let mut cells = self.cells.borrow_mut();
            let slot = cells.get_mut(cell).ok_or(ReactiveError::CellDisposed(cell))?;
            slot.value = Box::new(next);
            slot.subscribers.snapshot()
        };

        trace!(%cell, subscribers = subscribers.len(), "cell written");
        self.propagate(cell, subscribers);
        Ok(())
    }

    /// Remove a cell and drop it from its subscribers' dependency sets.
    pub(crate) fn dispose_cell(&self, cell: CellId) -> bool {
        let Some(slot) = self.cells.borrow_mut().remove(cell) else {
            return false;
        };

        {
            let mut computations = self.computations.borrow_mut();
            for subscriber in slot.subscribers.iter() {
                if let Some(computation) = computations.get_mut(subscriber) {
                    computation.deps.remove(cell);
                }
            }
        }

        trace!(%cell, "cell disposed");
        true
    }

    pub(crate) fn subscriber_count(&self, cell: CellId) -> usize {
        self.cells
            .borrow()
            .get(cell)
            .map_or(0, |slot| slot.subscribers.len())
    }
}

/// Read accessor of a reactive cell.
///
/// # Example
///
/// ```rust
/// use trellis_core::Runtime;
///
/// let runtime = Runtime::new();
/// let (count, set_count) = runtime.create_state(0);
///
/// set_count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct ReadSignal<T> {
    runtime: Weak<RuntimeInner>,
    id: CellId,
    _ty: PhantomData<fn() -> T>,
}

impl<T: Clone + 'static> ReadSignal<T> {
    pub(crate) fn new(runtime: Weak<RuntimeInner>, id: CellId) -> Self {
        Self {
            runtime,
            id,
            _ty: PhantomData,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    /// Get the current value.
    ///
    /// If called while a computation is running, that computation becomes a
    /// subscriber of this cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell was disposed or its runtime dropped. Use
    /// [`try_get`](Self::try_get) to handle those cases.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_get(&self) -> Result<T> {
        upgrade(&self.runtime)?.read_cell(self.id)
    }

    /// Get the current value without subscribing the running computation.
    pub fn get_untracked(&self) -> T {
        match self.try_get_untracked() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_get_untracked(&self) -> Result<T> {
        upgrade(&self.runtime)?.peek_cell(self.id)
    }

    /// Number of computations currently subscribed to this cell.
    pub fn subscriber_count(&self) -> usize {
        upgrade(&self.runtime).map_or(0, |runtime| runtime.subscriber_count(self.id))
    }

    pub fn is_disposed(&self) -> bool {
        upgrade(&self.runtime).map_or(true, |runtime| !runtime.cells.borrow().contains(self.id))
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: Weak::clone(&self.runtime),
            id: self.id,
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSignal").field("id", &self.id).finish()
    }
}

/// Write accessor of a reactive cell.
pub struct WriteSignal<T> {
    runtime: Weak<RuntimeInner>,
    id: CellId,
    _ty: PhantomData<fn(T)>,
}

impl<T: Clone + 'static> WriteSignal<T> {
    pub(crate) fn new(runtime: Weak<RuntimeInner>, id: CellId) -> Self {
        Self {
            runtime,
            id,
            _ty: PhantomData,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    /// Set a new value and synchronously re-run every subscriber.
    ///
    /// Writing a disposed cell logs a warning and does nothing.
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            warn!(cell = %self.id, %err, "write ignored");
        }
    }

    pub fn try_set(&self, value: T) -> Result<()> {
        self.dispatch(Action::SetValue(value))
    }

    /// Replace the value with `f(current)`.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + 'static,
    {
        if let Err(err) = self.dispatch(Action::update(f)) {
            warn!(cell = %self.id, %err, "update ignored");
        }
    }

    pub fn dispatch(&self, action: Action<T>) -> Result<()> {
        upgrade(&self.runtime)?.write_cell(self.id, action)
    }

    /// Remove the cell from the runtime. Later reads fail and later writes
    /// are ignored. Disposing twice is harmless.
    pub fn dispose(&self) {
        if let Ok(runtime) = upgrade(&self.runtime) {
            runtime.dispose_cell(self.id);
        }
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: Weak::clone(&self.runtime),
            id: self.id,
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal").field("id", &self.id).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
