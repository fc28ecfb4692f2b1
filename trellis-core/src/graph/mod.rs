//! Dependency Graph
//!
//! Inspection and scheduling support for the reactive graph.
//!
//! # Overview
//!
//! The graph is bipartite: cells on one side, computations on the other.
//! An edge means "this computation read this cell during its latest run"
//! and is stored on both endpoints. [`GraphSnapshot`] captures both
//! directions at a point in time so they can be checked against each other
//! or dumped as JSON for debugging.
//!
//! The `scheduler` submodule holds the worklist used by queued
//! propagation.

mod node;
mod scheduler;

use serde::{Deserialize, Serialize};

pub use node::{CellNode, ComputationNode};
pub(crate) use scheduler::{FlushGuard, RunQueue};

use crate::error::Result;
use crate::reactive::{CellId, ComputationId};

/// Point-in-time copy of every cell, computation and edge in a runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub cells: Vec<CellNode>,
    pub computations: Vec<ComputationNode>,
}

impl GraphSnapshot {
    pub fn cell(&self, id: CellId) -> Option<&CellNode> {
        self.cells.iter().find(|node| node.id == id)
    }

    pub fn computation(&self, id: ComputationId) -> Option<&ComputationNode> {
        self.computations.iter().find(|node| node.id == id)
    }

    pub fn edge_count(&self) -> usize {
        self.cells.iter().map(|node| node.subscribers.len()).sum()
    }

    /// Whether every edge is recorded on both of its endpoints.
    pub fn is_consistent(&self) -> bool {
        let forward = self.cells.iter().all(|cell| {
            cell.subscribers.iter().all(|sub| {
                self.computation(*sub)
                    .is_some_and(|computation| computation.depends_on(cell.id))
            })
        });
        let backward = self.computations.iter().all(|computation| {
            computation.dependencies.iter().all(|dep| {
                self.cell(*dep)
                    .is_some_and(|cell| cell.has_subscriber(computation.id))
            })
        });
        forward && backward
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
