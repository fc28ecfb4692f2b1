//! Reactive Runtime
//!
//! The runtime is the reactive scope that owns every cell and computation,
//! the context stack, and the propagation machinery. Nothing is global:
//! each [`Runtime`] is an independent graph, which keeps tests isolated and
//! lets a host embed several graphs side by side.
//!
//! # How It Works
//!
//! 1. `create_state` allocates a cell in the runtime's arena and returns
//!    typed handles to it.
//!
//! 2. `create_effect` / `create_memo` allocate a computation and run it
//!    once; the reads it performs establish its first set of edges.
//!
//! 3. A write stores the new value, copies the cell's subscriber list and
//!    hands it to [`RuntimeInner::propagate`], which re-runs each
//!    subscriber according to the configured [`Propagation`] mode.
//!
//! # Ownership
//!
//! Handles keep a weak reference to the runtime. Dropping the last
//! [`Runtime`] clone frees every cell and computation; handles used after
//! that report [`ReactiveError::RuntimeDropped`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error};

use super::arena::Arena;
use super::context::{ContextGuard, ContextStack, Frame};
use super::effect::Effect;
use super::memo::Memo;
use super::signal::{CellId, CellSlot, ReadSignal, WriteSignal};
use super::subscriber::{Computation, ComputationId, ComputationKind};
use crate::config::{Propagation, RuntimeConfig};
use crate::error::{ReactiveError, Result};
use crate::graph::{CellNode, ComputationNode, FlushGuard, GraphSnapshot, RunQueue};

/// Shared state behind a [`Runtime`] and its handles.
pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    pub(crate) cells: RefCell<Arena<CellId, CellSlot>>,
    pub(crate) computations: RefCell<Arena<ComputationId, Computation>>,
    pub(crate) stack: RefCell<ContextStack>,
    pub(crate) queue: RefCell<RunQueue>,
    /// Number of computation runs currently nested inside one another.
    pub(crate) depth: Cell<usize>,
    diagnostics: RefCell<VecDeque<ReactiveError>>,
}

pub(crate) fn upgrade(runtime: &Weak<RuntimeInner>) -> Result<Rc<RuntimeInner>> {
    runtime.upgrade().ok_or(ReactiveError::RuntimeDropped)
}

impl RuntimeInner {
    fn new(config: RuntimeConfig) -> Self {
        Self {
            queue: RefCell::new(RunQueue::new(config.max_queued_runs)),
            config,
            cells: RefCell::new(Arena::new()),
            computations: RefCell::new(Arena::new()),
            stack: RefCell::new(ContextStack::new()),
            depth: Cell::new(0),
            diagnostics: RefCell::new(VecDeque::new()),
        }
    }

    /// Keep an error for [`Runtime::take_errors`]. Callers log it themselves.
    pub(crate) fn report(&self, error: ReactiveError) {
        let capacity = self.config.diagnostics_capacity;
        if capacity == 0 {
            return;
        }
        let mut diagnostics = self.diagnostics.borrow_mut();
        while diagnostics.len() >= capacity {
            diagnostics.pop_front();
        }
        diagnostics.push_back(error);
    }

    /// Allocate a computation and run it once.
    pub(crate) fn spawn<F>(&self, kind: ComputationKind, body: F) -> ComputationId
    where
        F: Fn() + 'static,
    {
        let id = self
            .computations
            .borrow_mut()
            .insert(Computation::new(kind, body));
        debug!(computation = %id, ?kind, "computation created");
        self.run_computation(id);
        id
    }

    /// Re-run `subscribers` after a write to `source`.
    pub(crate) fn propagate(&self, source: CellId, subscribers: Vec<ComputationId>) {
        if subscribers.is_empty() {
            return;
        }
        debug!(
            cell = %source,
            subscribers = subscribers.len(),
            mode = ?self.config.propagation,
            "propagating write"
        );

        match self.config.propagation {
            Propagation::Recursive => {
                for computation in subscribers {
                    self.run_computation(computation);
                }
            }
            Propagation::Queued => {
                self.queue.borrow_mut().enqueue(subscribers);
                self.flush();
            }
        }
    }

    /// Drain the run queue. A no-op when a flush is already in progress
    /// further up the call stack; that flush will pick up the new entries.
    fn flush(&self) {
        let Some(_flush) = FlushGuard::begin(&self.queue) else {
            return;
        };

        loop {
            let next = self.queue.borrow_mut().next();
            match next {
                Ok(Some(computation)) => self.run_computation(computation),
                Ok(None) => break,
                Err(err) => {
                    error!(%err, "queued propagation aborted");
                    self.report(err);
                    break;
                }
            }
        }
    }
}

/// An owning reactive scope.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use trellis_core::Runtime;
///
/// let runtime = Runtime::new();
/// let (count, set_count) = runtime.create_state(1);
/// let doubled = runtime.create_memo(move || count.get() * 2);
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = seen.clone();
/// runtime.create_effect(move || log.borrow_mut().push(doubled.get()));
///
/// set_count.set(5);
/// assert_eq!(*seen.borrow(), vec![2, 10]);
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(config)),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    fn weak(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }

    /// A handle that does not keep the runtime alive.
    ///
    /// Computation bodies that need [`untracked`](WeakRuntime::untracked) or
    /// the tracking queries should capture this instead of a [`Runtime`]
    /// clone; a body holding a `Runtime` keeps the whole graph alive.
    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime { inner: self.weak() }
    }

    /// Allocate a cell holding `initial` and return its read and write
    /// accessors.
    pub fn create_state<T>(&self, initial: T) -> (ReadSignal<T>, WriteSignal<T>)
    where
        T: Clone + 'static,
    {
        let id = self.inner.cells.borrow_mut().insert(CellSlot::new(initial));
        debug!(cell = %id, "cell created");
        (
            ReadSignal::new(self.weak(), id),
            WriteSignal::new(self.weak(), id),
        )
    }

    /// Run `body` now, and again every time a cell it read during its
    /// latest run is written.
    ///
    /// A panic inside `body` is caught, logged and recorded in
    /// [`take_errors`](Self::take_errors); it never reaches the writer.
    pub fn create_effect<F>(&self, body: F) -> Effect
    where
        F: Fn() + 'static,
    {
        let id = self.inner.spawn(ComputationKind::Effect, body);
        Effect::new(self.weak(), id)
    }

    /// Create a derived value that is recomputed whenever a cell read by
    /// `compute` is written. Reading the memo never recomputes it.
    pub fn create_memo<T, F>(&self, compute: F) -> Memo<T>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
    {
        let (value, set_value) = self.create_state::<Option<T>>(None);
        let id = self.inner.spawn(ComputationKind::Memo, move || {
            set_value.set(Some(compute()));
        });
        Memo::new(self.weak(), value, id)
    }

    /// Run `f` with tracking masked: reads inside it subscribe nobody.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _mask = ContextGuard::enter(&self.inner.stack, Frame::Untracked);
        f()
    }

    /// Whether a read right now would subscribe a computation.
    pub fn is_tracking(&self) -> bool {
        self.current_computation().is_some()
    }

    pub fn current_computation(&self) -> Option<ComputationId> {
        self.inner.stack.borrow().current()
    }

    /// Number of frames on the context stack. Zero whenever no computation
    /// is running.
    pub fn context_depth(&self) -> usize {
        self.inner.stack.borrow().depth()
    }

    /// Drain the errors recorded while propagating writes.
    pub fn take_errors(&self) -> Vec<ReactiveError> {
        self.inner.diagnostics.borrow_mut().drain(..).collect()
    }

    /// Computations subscribed to `cell`, in subscription order.
    pub fn subscribers_of(&self, cell: CellId) -> Vec<ComputationId> {
        self.inner
            .cells
            .borrow()
            .get(cell)
            .map(|slot| slot.subscribers.snapshot())
            .unwrap_or_default()
    }

    /// Cells read by `computation` during its latest run.
    pub fn dependencies_of(&self, computation: ComputationId) -> Vec<CellId> {
        self.inner
            .computations
            .borrow()
            .get(computation)
            .map(|c| c.deps.iter().collect())
            .unwrap_or_default()
    }

    pub fn cell_count(&self) -> usize {
        self.inner.cells.borrow().len()
    }

    pub fn computation_count(&self) -> usize {
        self.inner.computations.borrow().len()
    }

    /// Capture the current dependency graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        let cells = self
            .inner
            .cells
            .borrow()
            .iter()
            .map(|(id, slot)| CellNode {
                id,
                subscribers: slot.subscribers.snapshot(),
            })
            .collect();

        let computations = self
            .inner
            .computations
            .borrow()
            .iter()
            .map(|(id, computation)| ComputationNode {
                id,
                kind: computation.kind,
                dependencies: computation.deps.iter().collect(),
                run_count: computation.run_count,
            })
            .collect();

        GraphSnapshot {
            cells,
            computations,
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("propagation", &self.inner.config.propagation)
            .field("cells", &self.cell_count())
            .field("computations", &self.computation_count())
            .finish()
    }
}

/// Non-owning counterpart of [`Runtime`], obtained from
/// [`Runtime::downgrade`].
#[derive(Clone)]
pub struct WeakRuntime {
    inner: Weak<RuntimeInner>,
}

impl WeakRuntime {
    /// The runtime, if it is still alive.
    pub fn upgrade(&self) -> Option<Runtime> {
        self.inner.upgrade().map(|inner| Runtime { inner })
    }

    /// Run `f` with tracking masked. Once the runtime is gone there is
    /// nothing to track and `f` simply runs.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.inner.upgrade() {
            Some(inner) => {
                let _mask = ContextGuard::enter(&inner.stack, Frame::Untracked);
                f()
            }
            None => f(),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.current_computation().is_some()
    }

    pub fn current_computation(&self) -> Option<ComputationId> {
        self.inner
            .upgrade()
            .and_then(|inner| inner.stack.borrow().current())
    }
}

impl fmt::Debug for WeakRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRuntime")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
