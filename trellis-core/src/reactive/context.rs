//! Execution Context
//!
//! The context stack records which computation is currently running, so a
//! cell read can find out who is reading it.
//!
//! # Implementation
//!
//! Each runtime owns one stack. Running a computation pushes a frame and the
//! returned [`ContextGuard`] pops it when dropped, so the stack stays
//! balanced no matter how the body exits. Frames nest: a memo created
//! inside an effect runs on top of that effect's frame.
//!
//! An [`Frame::Untracked`] frame masks every frame below it, which is how
//! [`Runtime::untracked`](super::Runtime::untracked) reads without
//! subscribing.

use std::cell::RefCell;

use super::ComputationId;

/// An entry in the context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Frame {
    Computation(ComputationId),
    Untracked,
}

#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The computation that should be credited with a read, if any.
    pub fn current(&self) -> Option<ComputationId> {
        match self.frames.last() {
            Some(Frame::Computation(id)) => Some(*id),
            Some(Frame::Untracked) | None => None,
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }
}

/// Guard that pops its frame when dropped.
pub(crate) struct ContextGuard<'a> {
    stack: &'a RefCell<ContextStack>,
    frame: Frame,
}

impl<'a> ContextGuard<'a> {
    pub fn enter(stack: &'a RefCell<ContextStack>, frame: Frame) -> Self {
        stack.borrow_mut().push(frame);
        Self { stack, frame }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.borrow_mut().pop();

        // Guards are strictly scoped, so the top must be ours.
        debug_assert_eq!(
            popped,
            Some(self.frame),
            "context stack mismatch: expected {:?}, got {:?}",
            self.frame,
            popped
        );
    }
}
