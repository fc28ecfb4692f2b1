//! Effect Implementation
//!
//! An effect is a side-effecting computation that re-runs whenever a cell it
//! read during its latest run is written.
//!
//! # The Run Protocol
//!
//! Every run of a computation, effect or memo alike, goes through
//! [`RuntimeInner::run_computation`]:
//!
//! 1. Teardown: the computation leaves the subscriber set of every cell in
//!    its dependency set, and the dependency set is cleared.
//!
//! 2. A frame for the computation is pushed onto the context stack.
//!
//! 3. The body runs. Each cell it reads links itself back to the
//!    computation, so the dependency set ends up holding exactly this run's
//!    reads. A panic is caught here, logged and recorded; it never
//!    propagates to whoever triggered the run.
//!
//! 4. The frame is popped by its guard on every exit path.
//!
//! A computation is never re-run by anything other than a write to one of
//! its dependencies.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace};

use super::context::{ContextGuard, Frame};
use super::edges;
use super::runtime::{upgrade, RuntimeInner};
use super::subscriber::{Computation, ComputationId};
use crate::error::{ReactiveError, Result};

impl RuntimeInner {
    /// Tear down, then re-run one computation. Unknown or disposed ids are
    /// skipped.
    pub(crate) fn run_computation(&self, id: ComputationId) {
        let depth = self.depth.get();
        if depth >= self.config.max_depth {
            let err = ReactiveError::DepthExceeded {
                computation: id,
                limit: self.config.max_depth,
            };
            error!(%err, "run skipped");
            self.report(err);
            return;
        }

        let body = {
            let mut computations = self.computations.borrow_mut();
            let Some(computation) = computations.get_mut(id) else {
                trace!(computation = %id, "skipping disposed computation");
                return;
            };
            let stale = computation.deps.take();
            edges::unlink_all(&mut self.cells.borrow_mut(), id, stale);
            Rc::clone(&computation.body)
        };

        debug!(computation = %id, depth, "running computation");
        self.depth.set(depth + 1);
        let outcome = {
            let _ctx = ContextGuard::enter(&self.stack, Frame::Computation(id));
            panic::catch_unwind(AssertUnwindSafe(|| body()))
        };
        self.depth.set(depth);

        if let Some(computation) = self.computations.borrow_mut().get_mut(id) {
            computation.run_count += 1;
        }

        if let Err(payload) = outcome {
            let err = ReactiveError::Panicked {
                computation: id,
                message: panic_message(payload.as_ref()),
            };
            error!(%err, "computation body failed");
            self.report(err);
        }
    }

    /// Unlink and remove a computation. Returns `false` if it was already gone.
    pub(crate) fn dispose_computation(&self, id: ComputationId) -> bool {
        let Some(computation) = self.computations.borrow_mut().remove(id) else {
            return false;
        };
        let Computation { deps, body, .. } = computation;
        edges::unlink_all(&mut self.cells.borrow_mut(), id, deps);
        debug!(computation = %id, "computation disposed");

        // The body may own handles; drop it with no borrow held.
        drop(body);
        true
    }

    fn computation_stat<R>(&self, id: ComputationId, f: impl FnOnce(&Computation) -> R) -> Option<R> {
        self.computations.borrow().get(id).map(f)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handle to an effect created by [`Runtime::create_effect`](super::Runtime::create_effect).
///
/// Dropping the handle does not stop the effect; call [`dispose`](Self::dispose).
///
/// # Example
///
/// ```rust
/// use trellis_core::Runtime;
///
/// let runtime = Runtime::new();
/// let (count, set_count) = runtime.create_state(0);
///
/// let effect = runtime.create_effect(move || {
///     println!("Count is: {}", count.get());
/// });
///
/// set_count.set(5); // Prints: "Count is: 5"
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Effect {
    runtime: Weak<RuntimeInner>,
    id: ComputationId,
}

impl Effect {
    pub(crate) fn new(runtime: Weak<RuntimeInner>, id: ComputationId) -> Self {
        Self { runtime, id }
    }

    pub fn id(&self) -> ComputationId {
        self.id
    }

    /// Number of times the body has run, the initial run included.
    /// Zero once the effect is disposed.
    pub fn run_count(&self) -> usize {
        self.try_run_count().unwrap_or(0)
    }

    pub fn try_run_count(&self) -> Result<usize> {
        upgrade(&self.runtime)?
            .computation_stat(self.id, |c| c.run_count)
            .ok_or(ReactiveError::ComputationDisposed(self.id))
    }

    /// Number of cells read during the latest run.
    pub fn dependency_count(&self) -> usize {
        upgrade(&self.runtime)
            .ok()
            .and_then(|runtime| runtime.computation_stat(self.id, |c| c.deps.len()))
            .unwrap_or(0)
    }

    /// Stop the effect: its edges are removed and it will not run again.
    pub fn dispose(&self) {
        if let Ok(runtime) = upgrade(&self.runtime) {
            runtime.dispose_computation(self.id);
        }
    }

    pub fn is_disposed(&self) -> bool {
        upgrade(&self.runtime).map_or(true, |runtime| !runtime.computations.borrow().contains(self.id))
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;
    use std::cell::{Cell, RefCell};
    use tracing_test::traced_test;

    #[test]
    fn effect_runs_on_creation() {
        let runtime = Runtime::new();
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let effect = runtime.create_effect(move || {
            run_count_clone.set(run_count_clone.get() + 1);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_on_dependency_write() {
        let runtime = Runtime::new();
        let (a, set_a) = runtime.create_state(1);
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_clone = log.clone();
        let effect = runtime.create_effect(move || log_clone.borrow_mut().push(a.get()));
        assert_eq!(*log.borrow(), vec![1]);

        set_a.set(2);
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(effect.run_count(), 2);
        assert_eq!(effect.dependency_count(), 1);
    }

    #[test]
    fn stale_dependency_is_dropped() {
        let runtime = Runtime::new();
        let (use_a, set_use_a) = runtime.create_state(true);
        let (a, set_a) = runtime.create_state(0);
        let (b, _) = runtime.create_state(0);
        let a_id = a.id();

        let effect = runtime.create_effect(move || {
            if use_a.get() {
                a.get();
            } else {
                b.get();
            }
        });
        assert_eq!(effect.dependency_count(), 2);
        assert_eq!(runtime.subscribers_of(a_id), vec![effect.id()]);

        set_use_a.set(false);
        assert!(runtime.subscribers_of(a_id).is_empty());
        assert_eq!(effect.dependency_count(), 2);

        set_a.set(9);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let runtime = Runtime::new();
        let (a, set_a) = runtime.create_state(0);
        let a_id = a.id();
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let effect = runtime.create_effect(move || {
            a.get();
            run_count_clone.set(run_count_clone.get() + 1);
        });

        effect.dispose();
        effect.dispose();
        assert!(effect.is_disposed());
        assert!(runtime.subscribers_of(a_id).is_empty());
        assert_eq!(runtime.computation_count(), 0);

        set_a.set(1);
        assert_eq!(run_count.get(), 1);
        assert_eq!(effect.run_count(), 0);
        assert!(matches!(
            effect.try_run_count(),
            Err(ReactiveError::ComputationDisposed(id)) if id == effect.id()
        ));
    }

    #[test]
    fn effect_disposing_itself_mid_run() {
        let runtime = Runtime::new();
        let (a, set_a) = runtime.create_state(0);
        let a_id = a.id();
        let slot: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));

        let slot_clone = slot.clone();
        let effect = runtime.create_effect(move || {
            if a.get() > 0 {
                if let Some(me) = slot_clone.borrow().as_ref() {
                    me.dispose();
                }
                // Reads after disposal must not resubscribe.
                a.get();
            }
        });
        *slot.borrow_mut() = Some(effect.clone());

        set_a.set(1);
        assert!(effect.is_disposed());
        assert!(runtime.subscribers_of(a_id).is_empty());
    }

    #[test]
    #[traced_test]
    fn panicking_body_is_contained() {
        let runtime = Runtime::new();
        let (a, set_a) = runtime.create_state(0);
        let (b, set_b) = runtime.create_state(0);
        let seen = Rc::new(Cell::new(0));

        let failing = runtime.create_effect(move || {
            a.get();
            panic!("first run fails");
        });
        assert_eq!(runtime.context_depth(), 0);
        assert_eq!(failing.run_count(), 1);
        // The read before the panic still counts as a dependency.
        assert_eq!(failing.dependency_count(), 1);

        let seen_clone = seen.clone();
        runtime.create_effect(move || seen_clone.set(b.get()));
        set_b.set(7);
        assert_eq!(seen.get(), 7);

        set_a.set(1);
        assert_eq!(failing.run_count(), 2);

        let errors = runtime.take_errors();
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            &errors[0],
            ReactiveError::Panicked { computation, message }
                if *computation == failing.id() && message == "first run fails"
        ));
        assert!(logs_contain("computation body failed"));
    }

    #[test]
    fn panic_does_not_block_sibling_subscribers() {
        let runtime = Runtime::new();
        let (a, set_a) = runtime.create_state(0);
        let seen = Rc::new(Cell::new(0));

        let a_first = a.clone();
        runtime.create_effect(move || {
            if a_first.get() > 0 {
                panic!("only on update");
            }
        });
        let seen_clone = seen.clone();
        runtime.create_effect(move || seen_clone.set(a.get()));

        set_a.set(3);
        assert_eq!(seen.get(), 3);
        assert_eq!(runtime.take_errors().len(), 1);
    }

    #[test]
    fn formatted_panic_message_is_captured() {
        let runtime = Runtime::new();
        runtime.create_effect(|| panic!("value was {}", 42));

        let errors = runtime.take_errors();
        assert!(matches!(
            &errors[0],
            ReactiveError::Panicked { message, .. } if message == "value was 42"
        ));
    }
}
