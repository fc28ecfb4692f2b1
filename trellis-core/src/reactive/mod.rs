//! Reactive Primitives
//!
//! This module implements the dependency-tracking engine: cells (signals),
//! effects and memos, all owned by a [`Runtime`].
//!
//! # Concepts
//!
//! ## Signals
//!
//! A signal is a cell holding mutable state. When it is read while a
//! computation is running, the cell and the computation link to each other.
//! When it is written, every linked computation re-runs.
//!
//! ## Effects
//!
//! An effect is a computation run for its side effects. It runs once when
//! created and again whenever a cell it read during its latest run changes.
//!
//! ## Memos
//!
//! A memo is a derived value: a private cell plus a computation that writes
//! the result of a function into it. Reading a memo returns the cached value.
//!
//! # Implementation Notes
//!
//! Each runtime keeps a context stack of running computations. A read
//! credits the computation on top of the stack. Before a computation re-runs
//! it removes all of its links, so the run rebuilds exactly the set of
//! cells it reads this time ("automatic dependency tracking").
//!
//! Cells and computations live in generational arenas inside the runtime
//! and refer to each other by id, so neither side owns the other.

mod arena;
mod context;
mod edges;
mod effect;
mod memo;
mod runtime;
mod signal;
mod subscriber;

pub use effect::Effect;
pub use memo::Memo;
pub use runtime::{Runtime, WeakRuntime};
pub use signal::{CellId, ReadSignal, WriteSignal};
pub use subscriber::{ComputationId, ComputationKind};
