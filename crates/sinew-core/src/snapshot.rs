//! Serializable project snapshots.
//!
//! The snapshot is the persistence boundary: the engine defines this schema
//! (items plus edge lists) and an external storage layer decides where the
//! bytes live. Restoring re-validates the structural invariants: a cycle
//! in a stored edge set means external corruption, and initialization of
//! that project must abort rather than operate on an inconsistent graph.

use serde::{Deserialize, Serialize};

use crate::graph::deps::{DependencyGraph, GraphError};
use crate::model::edge::{DependencyEdge, RelationshipEdge};
use crate::model::item::WorkItem;
use crate::store::{InMemoryStore, ItemStore, StoreError};

/// Snapshot of one project's items and edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project: String,
    pub items: Vec<WorkItem>,
    pub dependencies: Vec<DependencyEdge>,
    pub relationships: Vec<RelationshipEdge>,
}

/// Errors from snapshot restore. All of these indicate data corrupted
/// outside the engine; none are recoverable in-process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot contains a dependency cycle: {}", cycle.join(" -> "))]
    CorruptGraph { cycle: Vec<String> },
    #[error("snapshot contains conflicting parents for '{child}'")]
    ConflictingParents { child: String },
    #[error("snapshot contains duplicate item id '{id}'")]
    DuplicateItem { id: String },
}

impl ProjectSnapshot {
    /// Capture a snapshot from live parts. Items are cloned; edge order is
    /// the graph's deterministic order.
    #[must_use]
    pub fn capture(project: &str, items: &[&WorkItem], graph: &DependencyGraph) -> Self {
        Self {
            project: project.to_string(),
            items: items.iter().map(|item| (*item).clone()).collect(),
            dependencies: graph.dependencies().cloned().collect(),
            relationships: graph.relationships().cloned().collect(),
        }
    }

    /// Rebuild store and graph from the snapshot, verifying invariants.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::CorruptGraph`] if the stored ordering edges contain
    /// a cycle, [`SnapshotError::ConflictingParents`] for a broken forest,
    /// [`SnapshotError::DuplicateItem`] for repeated item ids.
    pub fn restore(self) -> Result<(InMemoryStore, DependencyGraph), SnapshotError> {
        let mut store = InMemoryStore::default();
        for item in self.items {
            match store.insert(item) {
                Ok(()) => {}
                Err(StoreError::DuplicateId(id)) => {
                    return Err(SnapshotError::DuplicateItem { id });
                }
                Err(StoreError::NotFound(id)) => {
                    // insert never reports NotFound; keep the match total.
                    return Err(SnapshotError::DuplicateItem { id });
                }
            }
        }

        let graph =
            DependencyGraph::from_edges_unchecked(self.dependencies, self.relationships);
        match graph.verify() {
            Ok(()) => Ok((store, graph)),
            Err(GraphError::CycleDetected { cycle }) => {
                Err(SnapshotError::CorruptGraph { cycle })
            }
            Err(GraphError::DuplicateParent { child, .. }) => {
                Err(SnapshotError::ConflictingParents { child })
            }
            Err(GraphError::EdgeNotFound { from_id, .. }) => {
                // verify never reports EdgeNotFound; keep the match total.
                Err(SnapshotError::CorruptGraph {
                    cycle: vec![from_id],
                })
            }
        }
    }
}
