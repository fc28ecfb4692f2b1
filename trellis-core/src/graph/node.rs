//! Graph Nodes
//!
//! Plain-data views of cells and computations used by [`GraphSnapshot`](super::GraphSnapshot).

use serde::{Deserialize, Serialize};

use crate::reactive::{CellId, ComputationId, ComputationKind};

/// A cell and the computations subscribed to it, in subscription order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellNode {
    pub id: CellId,
    pub subscribers: Vec<ComputationId>,
}

/// A computation and the cells it read during its latest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationNode {
    pub id: ComputationId,
    pub kind: ComputationKind,
    pub dependencies: Vec<CellId>,
    pub run_count: usize,
}

impl ComputationNode {
    pub fn depends_on(&self, cell: CellId) -> bool {
        self.dependencies.contains(&cell)
    }
}

impl CellNode {
    pub fn has_subscriber(&self, computation: ComputationId) -> bool {
        self.subscribers.contains(&computation)
    }
}
