//! Run Queue
//!
//! The worklist behind [`Propagation::Queued`](crate::Propagation::Queued).
//!
//! # Algorithm
//!
//! 1. A write appends its subscriber snapshot to the back of the queue.
//! 2. If no flush is in progress, the writer starts one and pops runs from
//!    the front until the queue is empty.
//! 3. Writes made by those runs only append; the active flush reaches them
//!    in FIFO order, so native stack depth stays constant.
//! 4. Each flush has a run budget. Exceeding it aborts the flush, clears
//!    the queue and reports how many runs were dropped.
//!
//! Entries are not deduplicated: two writes that notify the same
//! computation cause two runs.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{ReactiveError, Result};
use crate::reactive::ComputationId;

#[derive(Debug)]
pub(crate) struct RunQueue {
    pending: VecDeque<ComputationId>,
    flushing: bool,
    runs: usize,
    budget: usize,
}

impl RunQueue {
    pub fn new(budget: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            flushing: false,
            runs: 0,
            budget,
        }
    }

    pub fn enqueue(&mut self, computations: impl IntoIterator<Item = ComputationId>) {
        self.pending.extend(computations);
    }

    /// Pop the next run, charging it against the flush budget.
    pub fn next(&mut self) -> Result<Option<ComputationId>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        if self.runs >= self.budget {
            let dropped = self.pending.len();
            self.pending.clear();
            return Err(ReactiveError::RunBudgetExceeded {
                limit: self.budget,
                dropped,
            });
        }
        self.runs += 1;
        Ok(self.pending.pop_front())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_flushing(&self) -> bool {
        self.flushing
    }
}

/// Marks a flush as active for as long as it lives.
pub(crate) struct FlushGuard<'a> {
    queue: &'a RefCell<RunQueue>,
}

impl<'a> FlushGuard<'a> {
    /// Start a flush, or return `None` if one is already running.
    pub fn begin(queue: &'a RefCell<RunQueue>) -> Option<Self> {
        let mut q = queue.borrow_mut();
        if q.flushing {
            return None;
        }
        q.flushing = true;
        q.runs = 0;
        Some(Self { queue })
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        let mut q = self.queue.borrow_mut();
        q.flushing = false;
        q.runs = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;

    fn ids(count: usize) -> Vec<ComputationId> {
        // Real ids, so the queue is exercised with what the runtime hands it.
        let runtime = Runtime::new();
        (0..count).map(|_| runtime.create_effect(|| {}).id()).collect()
    }

    #[test]
    fn runs_come_out_in_fifo_order() {
        let ids = ids(3);
        let mut queue = RunQueue::new(10);
        queue.enqueue([ids[2], ids[0]]);
        queue.enqueue([ids[1], ids[2]]);

        let mut order = Vec::new();
        while let Some(id) = queue.next().unwrap() {
            order.push(id);
        }
        assert_eq!(order, vec![ids[2], ids[0], ids[1], ids[2]]);
    }

    #[test]
    fn budget_overrun_drops_remaining_runs() {
        let ids = ids(1);
        let mut queue = RunQueue::new(2);
        queue.enqueue([ids[0]; 5]);

        assert!(queue.next().unwrap().is_some());
        assert!(queue.next().unwrap().is_some());
        let err = queue.next().unwrap_err();
        assert!(matches!(err, ReactiveError::RunBudgetExceeded { limit: 2, dropped: 3 }));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn flush_guard_is_exclusive_and_resets() {
        let queue = RefCell::new(RunQueue::new(1));

        {
            let guard = FlushGuard::begin(&queue);
            assert!(guard.is_some());
            assert!(queue.borrow().is_flushing());
            assert!(FlushGuard::begin(&queue).is_none());
        }

        assert!(!queue.borrow().is_flushing());

        // The budget is per flush.
        let ids = ids(1);
        queue.borrow_mut().enqueue([ids[0], ids[0]]);
        let _guard = FlushGuard::begin(&queue);
        assert!(queue.borrow_mut().next().unwrap().is_some());
        assert!(queue.borrow_mut().next().is_err());
    }
}
