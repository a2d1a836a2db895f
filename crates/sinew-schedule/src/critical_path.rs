//! Critical path analysis for the schedule graph.
//!
//! # Overview
//!
//! The critical path is the longest duration-weighted dependency chain in
//! the project. Items on it have **zero slack**: any delay on them delays
//! the earliest possible completion of the whole project.
//!
//! # Definitions
//!
//! | Term              | Definition |
//! |-------------------|------------|
//! | `earliest_start`  | Earliest time the item can begin (all predecessors finished). |
//! | `earliest_finish` | `earliest_start + duration`. |
//! | `latest_start`    | Latest begin time that does not delay the project. |
//! | `latest_finish`   | `latest_start + duration`. |
//! | `slack`           | `latest_start - earliest_start`; zero on the critical path. |
//!
//! # Algorithm
//!
//! 1. **Forward pass** in topological order: `earliest_finish[v]` is the
//!    max predecessor finish plus `v`'s duration.
//! 2. **Backward pass** in reverse topological order: `latest_finish[v]`
//!    is the min successor `latest_start`, or the project finish for
//!    sinks.
//! 3. **Slack** and the zero-slack critical set fall out per node.
//! 4. **Path reconstruction** walks backwards from the zero-slack sink
//!    with the greatest finish, choosing the zero-slack predecessor whose
//!    finish meets the current item's start (ties broken by id for
//!    determinism).

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap};

use petgraph::{Direction, graph::NodeIndex, visit::EdgeRef};
use serde::{Deserialize, Serialize};

use crate::build::ScheduleGraph;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Per-item timing computed during critical path analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTiming {
    pub earliest_start: u64,
    pub earliest_finish: u64,
    pub latest_start: u64,
    pub latest_finish: u64,
    /// Total float: `latest_start - earliest_start`. Zero on the critical
    /// path.
    pub slack: u64,
}

/// Result of critical path analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPathResult {
    /// Item ids on the critical path, in dependency order (sources first).
    /// Empty when the graph has no items.
    pub critical_path: Vec<String>,
    /// All item ids with zero slack. May include items not on the
    /// reconstructed path when parallel critical chains tie.
    pub critical_items: BTreeSet<String>,
    /// Per-item timing information.
    pub item_timings: HashMap<String, ItemTiming>,
    /// Duration-weighted length of the whole project (max earliest finish).
    pub total_duration: u64,
}

impl CriticalPathResult {
    /// The empty result for a graph with no items.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            critical_path: Vec::new(),
            critical_items: BTreeSet::new(),
            item_timings: HashMap::new(),
            total_duration: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.critical_path.is_empty()
    }

    /// Timings along the reconstructed path, in path order.
    #[must_use]
    pub fn path_timings(&self) -> Vec<(&str, ItemTiming)> {
        self.critical_path
            .iter()
            .filter_map(|id| {
                self.item_timings
                    .get(id)
                    .map(|timing| (id.as_str(), *timing))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Forward pass: earliest finish per node, optionally with one node's
/// duration overridden (used by delay impact simulation).
pub(crate) fn forward_pass(
    sg: &ScheduleGraph,
    duration_override: Option<(NodeIndex, u64)>,
) -> HashMap<NodeIndex, u64> {
    let mut earliest_finish: HashMap<NodeIndex, u64> =
        HashMap::with_capacity(sg.topo_order().len());

    for &v in sg.topo_order() {
        let max_pred_finish = sg
            .graph
            .edges_directed(v, Direction::Incoming)
            .map(|e| earliest_finish.get(&e.source()).copied().unwrap_or(0))
            .max()
            .unwrap_or(0);
        let duration = match duration_override {
            Some((idx, d)) if idx == v => d,
            _ => u64::from(sg.duration(v)),
        };
        earliest_finish.insert(v, max_pred_finish + duration);
    }

    earliest_finish
}

/// Compute the critical path for the schedule graph.
///
/// The empty graph yields an empty path with zero total duration, not an
/// error.
#[must_use]
pub fn compute_critical_path(sg: &ScheduleGraph) -> CriticalPathResult {
    if sg.node_count() == 0 {
        return CriticalPathResult::empty();
    }

    let topo = sg.topo_order();

    // --- Forward pass: earliest start / earliest finish ---
    let earliest_finish = forward_pass(sg, None);

    // Project duration = max earliest finish over all nodes.
    let project_finish = earliest_finish.values().copied().max().unwrap_or(0);

    // --- Backward pass: latest finish / latest start ---
    let mut latest_finish: HashMap<NodeIndex, u64> = HashMap::with_capacity(topo.len());

    for &v in topo.iter().rev() {
        let min_succ_start = sg
            .graph
            .edges_directed(v, Direction::Outgoing)
            .map(|e| {
                let succ = e.target();
                let lf = latest_finish.get(&succ).copied().unwrap_or(project_finish);
                lf.saturating_sub(u64::from(sg.duration(succ)))
            })
            .min()
            .unwrap_or(project_finish);
        latest_finish.insert(v, min_succ_start);
    }

    // --- Per-item timings and the critical set ---
    let mut item_timings: HashMap<String, ItemTiming> = HashMap::with_capacity(topo.len());
    let mut critical_items: BTreeSet<String> = BTreeSet::new();
    let mut node_slack: HashMap<NodeIndex, u64> = HashMap::with_capacity(topo.len());

    for &v in topo {
        let duration = u64::from(sg.duration(v));
        let ef = earliest_finish[&v];
        let es = ef.saturating_sub(duration);
        let lf = latest_finish[&v];
        let ls = lf.saturating_sub(duration);
        let slack = ls.saturating_sub(es);

        node_slack.insert(v, slack);

        if let Some(id) = sg.item_id(v) {
            item_timings.insert(
                id.to_string(),
                ItemTiming {
                    earliest_start: es,
                    earliest_finish: ef,
                    latest_start: ls,
                    latest_finish: lf,
                    slack,
                },
            );
            if slack == 0 {
                critical_items.insert(id.to_string());
            }
        }
    }

    // --- Path reconstruction ---
    let critical_path = reconstruct_path(sg, &earliest_finish, &node_slack)
        .into_iter()
        .filter_map(|idx| sg.item_id(idx).map(str::to_string))
        .collect::<Vec<_>>();

    CriticalPathResult {
        critical_path,
        critical_items,
        item_timings,
        total_duration: project_finish,
    }
}

/// Walk from the zero-slack sink with the greatest finish back to a source
/// along zero-slack predecessors whose finish meets the current start.
fn reconstruct_path(
    sg: &ScheduleGraph,
    earliest_finish: &HashMap<NodeIndex, u64>,
    node_slack: &HashMap<NodeIndex, u64>,
) -> Vec<NodeIndex> {
    let Some(&sink) = sg
        .topo_order()
        .iter()
        .filter(|&&v| node_slack.get(&v).copied().unwrap_or(1) == 0)
        .max_by(|&&a, &&b| {
            let fa = earliest_finish.get(&a).copied().unwrap_or(0);
            let fb = earliest_finish.get(&b).copied().unwrap_or(0);
            // Tie-break on id so reconstruction is deterministic.
            fa.cmp(&fb)
                .then_with(|| sg.item_id(b).cmp(&sg.item_id(a)))
        })
    else {
        return Vec::new();
    };

    let mut path = vec![sink];
    let mut current = sink;

    loop {
        let current_start = earliest_finish
            .get(&current)
            .copied()
            .unwrap_or(0)
            .saturating_sub(u64::from(sg.duration(current)));

        let prev = sg
            .graph
            .edges_directed(current, Direction::Incoming)
            .map(|e| e.source())
            .filter(|idx| {
                node_slack.get(idx).copied().unwrap_or(1) == 0
                    && earliest_finish.get(idx).copied().unwrap_or(0) == current_start
            })
            .max_by(|&a, &b| sg.item_id(b).cmp(&sg.item_id(a)));

        match prev {
            Some(idx) => {
                path.push(idx);
                current = idx;
            }
            None => break,
        }
    }

    path.reverse();
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use sinew_core::model::edge::{DependencyEdge, DependencyKind};

    fn build(
        nodes: &[(&str, Option<u32>)],
        edges: &[(&str, &str)],
    ) -> ScheduleGraph {
        let node_list: Vec<(String, Option<u32>)> = nodes
            .iter()
            .map(|(id, d)| ((*id).to_string(), *d))
            .collect();
        let edge_list: Vec<DependencyEdge> = edges
            .iter()
            .map(|(a, b)| DependencyEdge::new(*a, *b, DependencyKind::Blocks))
            .collect();
        ScheduleGraph::build(node_list, &edge_list, 1).expect("DAG input")
    }

    #[test]
    fn empty_graph_returns_empty_result() {
        let sg = build(&[], &[]);
        let result = compute_critical_path(&sg);

        assert!(result.is_empty());
        assert!(result.critical_path.is_empty());
        assert!(result.critical_items.is_empty());
        assert_eq!(result.total_duration, 0);
    }

    #[test]
    fn single_node_is_critical() {
        let sg = build(&[("a", Some(4))], &[]);
        let result = compute_critical_path(&sg);

        assert_eq!(result.total_duration, 4);
        assert_eq!(result.critical_path, vec!["a".to_string()]);

        let timing = &result.item_timings["a"];
        assert_eq!(timing.earliest_start, 0);
        assert_eq!(timing.earliest_finish, 4);
        assert_eq!(timing.slack, 0);
    }

    #[test]
    fn linear_chain_sums_durations() {
        // a(2) -> b(3) -> c(4): path [a, b, c], total 9.
        let sg = build(
            &[("a", Some(2)), ("b", Some(3)), ("c", Some(4))],
            &[("a", "b"), ("b", "c")],
        );
        let result = compute_critical_path(&sg);

        assert_eq!(result.total_duration, 9);
        assert_eq!(
            result.critical_path,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        for id in ["a", "b", "c"] {
            assert_eq!(result.item_timings[id].slack, 0, "slack({id})");
        }

        let tb = &result.item_timings["b"];
        assert_eq!(tb.earliest_start, 2);
        assert_eq!(tb.earliest_finish, 5);
    }

    #[test]
    fn default_duration_fills_missing_estimates() {
        let sg = build(&[("a", None), ("b", None)], &[("a", "b")]);
        let result = compute_critical_path(&sg);
        assert_eq!(result.total_duration, 2, "two unit durations");
    }

    #[test]
    fn shorter_branch_has_slack() {
        // a(1) -> b(5) -> d(1)   (long branch)
        // a(1) -> e(2) -> d(1)   (short branch: e has slack 3)
        let sg = build(
            &[
                ("a", Some(1)),
                ("b", Some(5)),
                ("d", Some(1)),
                ("e", Some(2)),
            ],
            &[("a", "b"), ("b", "d"), ("a", "e"), ("e", "d")],
        );
        let result = compute_critical_path(&sg);

        assert_eq!(result.total_duration, 7);
        for id in ["a", "b", "d"] {
            assert_eq!(result.item_timings[id].slack, 0, "slack({id})");
        }
        assert_eq!(result.item_timings["e"].slack, 3);
        assert!(!result.critical_items.contains("e"));
        assert_eq!(
            result.critical_path,
            vec!["a".to_string(), "b".to_string(), "d".to_string()]
        );
    }

    #[test]
    fn uniform_diamond_everything_critical() {
        let sg = build(
            &[("a", None), ("b", None), ("c", None), ("d", None)],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let result = compute_critical_path(&sg);

        assert_eq!(result.total_duration, 3);
        // All four items have zero slack in a uniform diamond.
        assert_eq!(result.critical_items.len(), 4);
        // The reconstructed path picks one branch; ends are fixed.
        assert_eq!(result.critical_path.len(), 3);
        assert_eq!(result.critical_path.first().map(String::as_str), Some("a"));
        assert_eq!(result.critical_path.last().map(String::as_str), Some("d"));
    }

    #[test]
    fn disjoint_chains_longest_wins() {
        // Chain 1: a(2) -> b(2)        total 4
        // Chain 2: x(1) -> y(1) -> z(1) total 3
        let sg = build(
            &[
                ("a", Some(2)),
                ("b", Some(2)),
                ("x", Some(1)),
                ("y", Some(1)),
                ("z", Some(1)),
            ],
            &[("a", "b"), ("x", "y"), ("y", "z")],
        );
        let result = compute_critical_path(&sg);

        assert_eq!(result.total_duration, 4);
        assert_eq!(
            result.critical_path,
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(result.critical_items.contains("a"));
        assert!(!result.critical_items.contains("x"));
    }

    #[test]
    fn timing_invariants_hold() {
        let sg = build(
            &[
                ("a", Some(2)),
                ("b", Some(3)),
                ("c", Some(1)),
                ("d", Some(2)),
            ],
            &[("a", "b"), ("b", "d"), ("a", "c"), ("c", "d")],
        );
        let result = compute_critical_path(&sg);

        for (id, t) in &result.item_timings {
            assert!(t.earliest_finish >= t.earliest_start, "{id}");
            assert!(t.latest_finish >= t.latest_start, "{id}");
            assert!(t.latest_start >= t.earliest_start, "{id}: ls >= es");
            assert_eq!(
                t.slack,
                t.latest_start - t.earliest_start,
                "{id}: slack definition"
            );
            assert!(t.latest_finish <= result.total_duration, "{id}");
        }
    }

    #[test]
    fn path_is_in_dependency_order() {
        let sg = build(
            &[("a", Some(1)), ("b", Some(2)), ("c", Some(3)), ("d", Some(1))],
            &[("a", "b"), ("b", "c"), ("c", "d")],
        );
        let result = compute_critical_path(&sg);

        for window in result.critical_path.windows(2) {
            let ta = &result.item_timings[&window[0]];
            let tb = &result.item_timings[&window[1]];
            assert!(
                ta.earliest_finish <= tb.earliest_start,
                "{} must finish before {} starts",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn path_timings_follow_path_order() {
        let sg = build(
            &[("a", Some(2)), ("b", Some(3))],
            &[("a", "b")],
        );
        let result = compute_critical_path(&sg);
        let timings = result.path_timings();
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[0].0, "a");
        assert_eq!(timings[1].1.earliest_start, 2);
    }

    #[test]
    fn result_serializes_for_api_marshaling() {
        let sg = build(&[("a", Some(1))], &[]);
        let result = compute_critical_path(&sg);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("critical_path"));
        assert!(json.contains("total_duration"));
    }
}
