//! List-based Hooks
//!
//! A second, non-tracking way to keep state across re-executions of a
//! function. Instead of linking cells to computations, a [`Fiber`] re-runs
//! its whole component on every update and hands it a [`Hooks`] cursor. Each
//! `use_state` call claims the next slot in a list, so state is identified
//! purely by call position.
//!
//! Updates go through a [`Dispatch`]: the action is queued on its slot and
//! the fiber renders again. During that render `use_state` folds every
//! queued [`Action`](crate::Action) into the stored value, in dispatch order.
//!
//! Compared with the tracking runtime in [`reactive`](crate::reactive), this
//! model needs no dependency bookkeeping but always re-executes everything
//! and relies on hooks being called in a fixed order.

mod fiber;

pub use fiber::{Dispatch, Fiber, Hooks, MAX_RENDER_PASSES};
