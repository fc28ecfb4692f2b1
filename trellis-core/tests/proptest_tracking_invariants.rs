//! Property-based invariant tests for dependency tracking.
//!
//! These tests drive a small graph with random write sequences and check,
//! after every write:
//!
//! 1. Memo consistency: a memo always equals its function of the current cells
//! 2. Edge symmetry: every edge is recorded on both of its endpoints
//! 3. Stale edges: a branch not taken has no subscribers
//! 4. Exact notification: an effect runs once per write it depends on
//! 5. Mode parity: recursive and queued propagation settle on the same values

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use trellis_core::{Memo, Propagation, ReadSignal, Runtime, RuntimeConfig, WriteSignal};

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Op {
    A(i64),
    B(i64),
    Flag(bool),
    Unrelated(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-1000_i64..1000).prop_map(Op::A),
        (-1000_i64..1000).prop_map(Op::B),
        any::<bool>().prop_map(Op::Flag),
        (-1000_i64..1000).prop_map(Op::Unrelated),
    ]
}

fn expected(a: i64, b: i64, flag: bool) -> i64 {
    if flag {
        a + b
    } else {
        a * 2
    }
}

struct Graph {
    runtime: Runtime,
    a: ReadSignal<i64>,
    set_a: WriteSignal<i64>,
    b: ReadSignal<i64>,
    set_b: WriteSignal<i64>,
    flag: ReadSignal<bool>,
    set_flag: WriteSignal<bool>,
    set_unrelated: WriteSignal<i64>,
    memo: Memo<i64>,
    effect_runs: Rc<Cell<usize>>,
}

fn build(propagation: Propagation) -> Graph {
    let runtime = Runtime::with_config(RuntimeConfig::default().with_propagation(propagation));
    let (a, set_a) = runtime.create_state(0_i64);
    let (b, set_b) = runtime.create_state(0_i64);
    let (flag, set_flag) = runtime.create_state(true);
    let (_, set_unrelated) = runtime.create_state(0_i64);

    let memo = {
        let (a, b, flag) = (a.clone(), b.clone(), flag.clone());
        runtime.create_memo(move || {
            if flag.get() {
                a.get() + b.get()
            } else {
                a.get() * 2
            }
        })
    };

    let effect_runs = Rc::new(Cell::new(0));
    {
        let memo = memo.clone();
        let runs = effect_runs.clone();
        runtime.create_effect(move || {
            memo.get();
            runs.set(runs.get() + 1);
        });
    }

    Graph {
        runtime,
        a,
        set_a,
        b,
        set_b,
        flag,
        set_flag,
        set_unrelated,
        memo,
        effect_runs,
    }
}

impl Graph {
    /// Apply one write. Returns whether the memo had to re-run.
    fn apply(&self, op: Op) -> bool {
        let reads_b = self.flag.get_untracked();
        match op {
            Op::A(v) => {
                self.set_a.set(v);
                true
            }
            Op::B(v) => {
                self.set_b.set(v);
                reads_b
            }
            Op::Flag(v) => {
                self.set_flag.set(v);
                true
            }
            Op::Unrelated(v) => {
                self.set_unrelated.set(v);
                false
            }
        }
    }

    fn settled(&self) -> (i64, i64, bool, i64) {
        (
            self.a.get_untracked(),
            self.b.get_untracked(),
            self.flag.get_untracked(),
            self.memo.get_untracked(),
        )
    }
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn memo_matches_current_cells(ops in prop::collection::vec(op_strategy(), 0..48)) {
        let graph = build(Propagation::Recursive);
        for op in ops {
            graph.apply(op);
            let (a, b, flag, memo) = graph.settled();
            prop_assert_eq!(memo, expected(a, b, flag));
        }
    }

    #[test]
    fn edges_stay_symmetric(ops in prop::collection::vec(op_strategy(), 0..48)) {
        let graph = build(Propagation::Recursive);
        for op in ops {
            graph.apply(op);
            let snapshot = graph.runtime.snapshot();
            prop_assert!(snapshot.is_consistent());
            // a and flag always feed the memo; b only on the sum branch.
            let expected_edges = if graph.flag.get_untracked() { 4 } else { 3 };
            prop_assert_eq!(snapshot.edge_count(), expected_edges);
        }
    }

    #[test]
    fn untaken_branch_has_no_subscribers(ops in prop::collection::vec(op_strategy(), 1..48)) {
        let graph = build(Propagation::Recursive);
        for op in ops {
            graph.apply(op);
            let b_subscribers = graph.b.subscriber_count();
            if graph.flag.get_untracked() {
                prop_assert_eq!(b_subscribers, 1);
            } else {
                prop_assert_eq!(b_subscribers, 0);
            }
        }
    }

    #[test]
    fn effect_runs_once_per_relevant_write(ops in prop::collection::vec(op_strategy(), 0..48)) {
        let graph = build(Propagation::Recursive);
        let mut expected_runs = 1;
        for op in ops {
            if graph.apply(op) {
                expected_runs += 1;
            }
            prop_assert_eq!(graph.effect_runs.get(), expected_runs);
        }
    }

    #[test]
    fn queued_mode_settles_like_recursive(ops in prop::collection::vec(op_strategy(), 0..48)) {
        let recursive = build(Propagation::Recursive);
        let queued = build(Propagation::Queued);
        for op in ops {
            recursive.apply(op);
            queued.apply(op);
            prop_assert_eq!(recursive.settled(), queued.settled());
            prop_assert_eq!(recursive.effect_runs.get(), queued.effect_runs.get());
        }
        prop_assert!(queued.runtime.take_errors().is_empty());
    }
}
