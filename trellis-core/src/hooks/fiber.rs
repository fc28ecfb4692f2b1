//! Fiber, hook slots and dispatch.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::action::Action;
use crate::error::{ReactiveError, Result};

/// Render passes allowed in a row while the component keeps dispatching
/// updates to itself.
pub const MAX_RENDER_PASSES: usize = 50;

type Queue<T> = Rc<RefCell<VecDeque<Action<T>>>>;

/// One `use_state` slot.
struct StateHook<T> {
    /// Value as of the last successful render.
    value: T,
    /// Value computed by the render in progress.
    work: Option<T>,
    queue: Queue<T>,
}

/// Type-erased hook slot. A render pass commits every slot when it
/// succeeds and discards its work when it fails.
trait Slot {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn commit(&mut self);
    fn discard(&mut self);
}

impl<T: 'static> Slot for StateHook<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn commit(&mut self) {
        if let Some(value) = self.work.take() {
            self.value = value;
        }
    }

    fn discard(&mut self) {
        self.work = None;
    }
}

/// Something a [`Dispatch`] can ask to render again.
trait Rerender {
    fn rerender(&self) -> Result<()>;
}

struct FiberInner<Out> {
    this: Weak<FiberInner<Out>>,
    component: Box<dyn Fn(&mut Hooks) -> Result<Out>>,
    slots: RefCell<Vec<Box<dyn Slot>>>,
    output: RefCell<Option<Rc<Out>>>,
    mounted: Cell<bool>,
    rendering: Cell<bool>,
    dirty: Cell<bool>,
    renders: Cell<usize>,
}

/// Clears the rendering flag however the render exits.
struct RenderGuard<'a>(&'a Cell<bool>);

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<Out: 'static> FiberInner<Out> {
    fn render(&self) -> Result<()> {
        if self.rendering.get() {
            // Picked up by the loop below once the current pass finishes.
            self.dirty.set(true);
            return Ok(());
        }
        self.rendering.set(true);
        let _guard = RenderGuard(&self.rendering);

        for _ in 0..MAX_RENDER_PASSES {
            self.dirty.set(false);
            self.render_pass()?;
            if !self.dirty.get() {
                return Ok(());
            }
        }

        Err(ReactiveError::TooManyRenders {
            limit: MAX_RENDER_PASSES,
        })
    }

    fn render_pass(&self) -> Result<()> {
        let mounting = !self.mounted.get();
        let scheduler: Weak<dyn Rerender> = self.this.clone();
        let mut hooks = Hooks {
            slots: mem::take(&mut *self.slots.borrow_mut()),
            cursor: 0,
            mounting,
            scheduler,
        };

        let result = (self.component)(&mut hooks);
        let Hooks {
            mut slots, cursor, ..
        } = hooks;
        let expected = slots.len();
        let result = result.and_then(|output| {
            if cursor != expected {
                warn!(called = cursor, expected, "hook count changed between renders");
                return Err(ReactiveError::HookOrder {
                    index: cursor.min(expected),
                });
            }
            Ok(output)
        });

        // A failed pass leaves state at the last good render, matching the
        // output. Actions it consumed are dropped with it.
        match result {
            Ok(_) => slots.iter_mut().for_each(|slot| slot.commit()),
            Err(_) if mounting => slots.clear(),
            Err(_) => slots.iter_mut().for_each(|slot| slot.discard()),
        }
        *self.slots.borrow_mut() = slots;
        let output = result?;

        self.mounted.set(true);
        self.renders.set(self.renders.get() + 1);
        *self.output.borrow_mut() = Some(Rc::new(output));
        debug!(render = self.renders.get(), mounting, hooks = expected, "fiber rendered");
        Ok(())
    }
}

impl<Out: 'static> Rerender for FiberInner<Out> {
    fn rerender(&self) -> Result<()> {
        self.render()
    }
}

/// A component function plus the hook state that survives between its
/// renders.
///
/// The component is re-executed in full on every update; hooks are matched
/// to their state by call position, so they must be called in the same
/// order and number on every render.
///
/// # Example
///
/// ```rust
/// use trellis_core::hooks::Fiber;
///
/// let fiber = Fiber::mount(|hooks| {
///     let (count, set_count) = hooks.use_state(0)?;
///     Ok((count, set_count))
/// })
/// .unwrap();
///
/// let (_, set_count) = fiber.output().unwrap();
/// set_count.update(|n| n + 1).unwrap();
/// assert_eq!(fiber.output().unwrap().0, 1);
/// ```
pub struct Fiber<Out> {
    inner: Rc<FiberInner<Out>>,
}

impl<Out: 'static> Fiber<Out> {
    /// Create the fiber and perform the mount render.
    pub fn mount<F>(component: F) -> Result<Self>
    where
        F: Fn(&mut Hooks) -> Result<Out> + 'static,
    {
        let inner = Rc::new_cyclic(|this| FiberInner {
            this: this.clone(),
            component: Box::new(component),
            slots: RefCell::new(Vec::new()),
            output: RefCell::new(None),
            mounted: Cell::new(false),
            rendering: Cell::new(false),
            dirty: Cell::new(false),
            renders: Cell::new(0),
        });
        inner.render()?;
        Ok(Self { inner })
    }

    /// Output of the latest successful render.
    pub fn output(&self) -> Option<Out>
    where
        Out: Clone,
    {
        self.inner.output.borrow().as_deref().cloned()
    }

    /// Call `f` with the latest output. `f` may dispatch; the render it
    /// triggers does not disturb the output `f` is looking at.
    pub fn with_output<R>(&self, f: impl FnOnce(&Out) -> R) -> Option<R> {
        let output = self.inner.output.borrow().clone();
        output.map(|output| f(&output))
    }

    pub fn render_count(&self) -> usize {
        self.inner.renders.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    pub fn hook_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }
}

impl<Out> fmt::Debug for Fiber<Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("mounted", &self.inner.mounted.get())
            .field("renders", &self.inner.renders.get())
            .field("hooks", &self.inner.slots.borrow().len())
            .finish()
    }
}

/// Hook access handed to the component during a render.
pub struct Hooks {
    slots: Vec<Box<dyn Slot>>,
    cursor: usize,
    mounting: bool,
    scheduler: Weak<dyn Rerender>,
}

impl Hooks {
    /// Declare a piece of state.
    ///
    /// On mount the slot is created with `initial`. On later renders
    /// `initial` is ignored; the stored value is read and every action
    /// dispatched since the previous render is applied to it in order.
    pub fn use_state<T>(&mut self, initial: T) -> Result<(T, Dispatch<T>)>
    where
        T: Clone + 'static,
    {
        let index = self.cursor;
        self.cursor += 1;

        if self.mounting {
            let hook = StateHook {
                value: initial,
                work: None,
                queue: Queue::<T>::default(),
            };
            let result = (hook.value.clone(), self.dispatch_for(&hook.queue));
            self.slots.push(Box::new(hook));
            return Ok(result);
        }

        let hook = self
            .slots
            .get_mut(index)
            .and_then(|slot| slot.as_any_mut().downcast_mut::<StateHook<T>>())
            .ok_or(ReactiveError::HookOrder { index })?;

        let pending: Vec<Action<T>> = hook.queue.borrow_mut().drain(..).collect();
        let mut value = hook.value.clone();
        for action in pending {
            value = action.apply(&value);
        }

        hook.work = Some(value.clone());
        let queue = Rc::clone(&hook.queue);
        Ok((value, self.dispatch_for(&queue)))
    }

    /// Whether this is the first render of the fiber.
    pub fn is_mounting(&self) -> bool {
        self.mounting
    }

    fn dispatch_for<T>(&self, queue: &Queue<T>) -> Dispatch<T> {
        Dispatch {
            queue: Rc::clone(queue),
            fiber: self.scheduler.clone(),
        }
    }
}

/// Enqueues updates for one `use_state` slot and re-renders its fiber.
pub struct Dispatch<T> {
    queue: Queue<T>,
    fiber: Weak<dyn Rerender>,
}

impl<T> Dispatch<T> {
    /// Queue `action` and render the fiber again.
    ///
    /// Called during a render, the update is applied by an extra render
    /// pass right after the current one.
    pub fn dispatch(&self, action: Action<T>) -> Result<()> {
        let fiber = self.fiber.upgrade().ok_or(ReactiveError::RuntimeDropped)?;
        self.queue.borrow_mut().push_back(action);
        fiber.rerender()
    }

    pub fn set(&self, value: T) -> Result<()> {
        self.dispatch(Action::SetValue(value))
    }

    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T + 'static,
    {
        self.dispatch(Action::update(f))
    }

    /// Number of actions waiting for the next render.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl<T> Clone for Dispatch<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
            fiber: Weak::clone(&self.fiber),
        }
    }
}

impl<T> fmt::Debug for Dispatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}
