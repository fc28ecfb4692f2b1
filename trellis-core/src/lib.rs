//! Trellis Core
//!
//! A fine-grained reactive runtime. Cells (signals) hold values; effects and
//! memos are computations that read them. The runtime records which cells a
//! computation read on its latest run, and a write re-runs exactly those
//! computations. No subscription wiring or dependency lists are declared by
//! hand.
//!
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects) with automatic
//!   dependency tracking
//! - Recursive or queued propagation with explicit depth and run budgets
//! - Graph inspection and JSON snapshots
//! - A list-based hook emulation for comparison
//!
//! # Architecture
//!
//! - `reactive`: the runtime, cells, computations and the tracking engine
//! - `graph`: snapshots of the dependency graph and the propagation worklist
//! - `hooks`: call-position state slots re-evaluated on every render
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use trellis_core::Runtime;
//!
//! let runtime = Runtime::new();
//!
//! // Create a signal
//! let (count, set_count) = runtime.create_state(0);
//!
//! // Create a derived value
//! let doubled = runtime.create_memo(move || count.get() * 2);
//!
//! // Create an effect
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let sink = log.clone();
//! runtime.create_effect(move || sink.borrow_mut().push(doubled.get()));
//!
//! // Update the signal; the memo and then the effect re-run
//! set_count.set(5);
//! assert_eq!(*log.borrow(), vec![0, 10]);
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod reactive;

pub use action::Action;
pub use config::{Propagation, RuntimeConfig};
pub use error::{ReactiveError, Result};
pub use graph::GraphSnapshot;
pub use reactive::{
    CellId, ComputationId, ComputationKind, Effect, Memo, ReadSignal, Runtime, WeakRuntime,
    WriteSignal,
};
