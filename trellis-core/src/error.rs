//! Error types for the reactive runtime.

use thiserror::Error;

use crate::reactive::{CellId, ComputationId};

/// Errors reported by the reactive runtime.
///
/// Errors that happen while propagating a write (a panicking body, a run
/// that nests too deep, a runaway queue) never reach the caller of `set`.
/// They are logged and kept in the runtime's diagnostics buffer, see
/// [`Runtime::take_errors`](crate::reactive::Runtime::take_errors).
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A computation body panicked. The panic was caught at the run boundary.
    #[error("computation {computation} panicked: {message}")]
    Panicked {
        computation: ComputationId,
        message: String,
    },

    /// A run was skipped because computations were already nested `limit` deep.
    #[error("computation {computation} skipped: run depth limit of {limit} reached")]
    DepthExceeded {
        computation: ComputationId,
        limit: usize,
    },

    /// Queued propagation ran out of budget; the remaining runs were dropped.
    #[error("propagation exceeded {limit} queued runs, dropped {dropped} pending runs")]
    RunBudgetExceeded { limit: usize, dropped: usize },

    #[error("cell {0} has been disposed")]
    CellDisposed(CellId),

    #[error("computation {0} has been disposed")]
    ComputationDisposed(ComputationId),

    /// The handle outlived the runtime that owned it.
    #[error("the owning runtime has been dropped")]
    RuntimeDropped,

    /// A memo whose computation has never completed a run.
    #[error("memo cell {0} has no value yet")]
    Uncomputed(CellId),

    #[error("cell {0} does not hold a value of the requested type")]
    TypeMismatch(CellId),

    /// Hooks were called in a different order or count than at mount.
    #[error("hook order changed between renders at position {index}")]
    HookOrder { index: usize },

    /// A component kept dispatching updates while rendering.
    #[error("component re-rendered {limit} times in a row without settling")]
    TooManyRenders { limit: usize },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;
