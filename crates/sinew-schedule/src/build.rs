//! Schedule graph construction from a project's edge list.
//!
//! # Overview
//!
//! Builds a [`petgraph`] directed graph suitable for scheduling analysis
//! (critical path, delay impact, level sets) from work item ids, duration
//! estimates, and the ordering dependency edges.
//!
//! ## Edge Direction
//!
//! An edge `A -> B` in the schedule graph means "A must finish before B
//! starts". Dependency kinds are normalized into this direction via
//! [`DependencyKind::ordered`]; `conflicts_with` edges impose no order and
//! are skipped.
//!
//! ## Scope
//!
//! Only edges whose both endpoints are in the supplied node set are used:
//! the analysis is restricted to the project scope, and cross-team edges
//! pointing outside it do not constrain the schedule.
//!
//! ## Cache Invalidation
//!
//! The graph carries a BLAKE3 content hash of the sorted node/duration and
//! edge lists. Callers can compare the hash against a stored value to skip
//! recomputing analysis results when nothing changed.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::instrument;

use sinew_core::model::edge::{DependencyEdge, DependencyKind};

/// Errors from schedule graph construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The ordering edges contain a cycle. The core graph's invariant makes
    /// this unreachable through normal operation; seeing it means the input
    /// bypassed `DependencyGraph`.
    #[error("schedule input contains a cycle through '{member}'")]
    CyclicGraph { member: String },

    /// An analysis was asked about an item outside the graph.
    #[error("item not in schedule graph: '{0}'")]
    UnknownItem(String),
}

/// A directed scheduling DAG with per-item durations.
#[derive(Debug, Clone)]
pub struct ScheduleGraph {
    /// Nodes are item ids; an edge `A -> B` means A finishes before B.
    pub graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    durations: HashMap<NodeIndex, u32>,
    topo: Vec<NodeIndex>,
    /// BLAKE3 hash of the node, duration, and edge lists.
    pub content_hash: String,
}

impl ScheduleGraph {
    /// Build a schedule graph.
    ///
    /// `nodes` supplies every in-scope item id with its optional duration
    /// estimate; items without an estimate get `default_duration` so the
    /// analysis stays total. Edges referencing ids outside `nodes` are
    /// ignored, as are non-ordering kinds. Duplicate logical edges collapse
    /// to one.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::CyclicGraph`] if the resulting graph is not a DAG.
    #[instrument(skip_all)]
    pub fn build<I>(
        nodes: I,
        edges: &[DependencyEdge],
        default_duration: u32,
    ) -> Result<Self, ScheduleError>
    where
        I: IntoIterator<Item = (String, Option<u32>)>,
    {
        let mut graph = DiGraph::<String, ()>::new();
        let mut node_map: HashMap<String, NodeIndex> = HashMap::new();
        let mut durations: HashMap<NodeIndex, u32> = HashMap::new();

        let mut node_list: Vec<(String, Option<u32>)> = nodes.into_iter().collect();
        node_list.sort();
        node_list.dedup_by(|a, b| a.0 == b.0);

        for (id, estimate) in node_list {
            let idx = graph.add_node(id.clone());
            durations.insert(idx, estimate.unwrap_or(default_duration));
            node_map.insert(id, idx);
        }

        let mut ordered_pairs: Vec<(String, String)> = edges
            .iter()
            .filter(|e| e.kind != DependencyKind::ConflictsWith)
            .filter_map(DependencyEdge::ordered)
            .filter(|(first, second)| {
                node_map.contains_key(*first) && node_map.contains_key(*second)
            })
            .map(|(first, second)| (first.to_string(), second.to_string()))
            .collect();
        ordered_pairs.sort();
        ordered_pairs.dedup();

        let content_hash = compute_content_hash(&durations, &node_map, &ordered_pairs);

        for (first, second) in ordered_pairs {
            let a = node_map[&first];
            let b = node_map[&second];
            graph.add_edge(a, b, ());
        }

        let topo = toposort(&graph, None).map_err(|cycle| ScheduleError::CyclicGraph {
            member: graph
                .node_weight(cycle.node_id())
                .cloned()
                .unwrap_or_default(),
        })?;

        Ok(Self {
            graph,
            node_map,
            durations,
            topo,
            content_hash,
        })
    }

    /// Number of items in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of ordering edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up the node index for an item id.
    #[must_use]
    pub fn node_index(&self, item_id: &str) -> Option<NodeIndex> {
        self.node_map.get(item_id).copied()
    }

    /// The item id label for a node.
    #[must_use]
    pub fn item_id(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(String::as_str)
    }

    /// Effective duration of a node (estimate or the default).
    #[must_use]
    pub fn duration(&self, idx: NodeIndex) -> u32 {
        self.durations.get(&idx).copied().unwrap_or(1)
    }

    /// Topological order, computed once at build time.
    #[must_use]
    pub fn topo_order(&self) -> &[NodeIndex] {
        &self.topo
    }
}

/// Hash nodes, durations, and edges so the value changes exactly when the
/// schedule inputs change.
fn compute_content_hash(
    durations: &HashMap<NodeIndex, u32>,
    node_map: &HashMap<String, NodeIndex>,
    edges: &[(String, String)],
) -> String {
    let mut hasher = blake3::Hasher::new();

    let mut ids: Vec<&str> = node_map.keys().map(String::as_str).collect();
    ids.sort_unstable();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\x00");
        let duration = node_map
            .get(id)
            .and_then(|idx| durations.get(idx))
            .copied()
            .unwrap_or_default();
        hasher.update(&duration.to_le_bytes());
    }

    for (first, second) in edges {
        hasher.update(first.as_bytes());
        hasher.update(b"\x00");
        hasher.update(second.as_bytes());
        hasher.update(b"\x00");
    }

    format!("blake3:{}", hasher.finalize())
}
