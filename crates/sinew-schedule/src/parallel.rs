//! Parallelizable work detection.
//!
//! Groups items into level sets by longest-path depth (edge count, not
//! duration). Two items in the same level can never be ordered: an edge
//! between them would force the successor at least one level deeper. Levels
//! come out in dependency order, so level 0 is the set of items that can
//! start immediately.

use petgraph::{Direction, visit::EdgeRef};
use std::collections::HashMap;

use crate::build::ScheduleGraph;

/// Partition the graph into level sets with no mutual ordering constraint.
///
/// The empty graph yields no levels. Items inside a level are sorted by id
/// for deterministic output.
#[must_use]
pub fn parallel_sets(sg: &ScheduleGraph) -> Vec<Vec<String>> {
    let mut depth: HashMap<petgraph::graph::NodeIndex, usize> =
        HashMap::with_capacity(sg.topo_order().len());

    for &v in sg.topo_order() {
        let level = sg
            .graph
            .edges_directed(v, Direction::Incoming)
            .map(|e| depth.get(&e.source()).copied().unwrap_or(0) + 1)
            .max()
            .unwrap_or(0);
        depth.insert(v, level);
    }

    let max_depth = depth.values().copied().max().map_or(0, |d| d + 1);
    let mut levels: Vec<Vec<String>> = vec![Vec::new(); max_depth];
    for (&v, &level) in &depth {
        if let Some(id) = sg.item_id(v) {
            levels[level].push(id.to_string());
        }
    }
    for level in &mut levels {
        level.sort_unstable();
    }
    levels.retain(|level| !level.is_empty());
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use sinew_core::model::edge::{DependencyEdge, DependencyKind};

    fn build(nodes: &[&str], edges: &[(&str, &str)]) -> ScheduleGraph {
        let node_list: Vec<(String, Option<u32>)> =
            nodes.iter().map(|id| ((*id).to_string(), None)).collect();
        let edge_list: Vec<DependencyEdge> = edges
            .iter()
            .map(|(a, b)| DependencyEdge::new(*a, *b, DependencyKind::Blocks))
            .collect();
        ScheduleGraph::build(node_list, &edge_list, 1).expect("DAG input")
    }

    #[test]
    fn empty_graph_has_no_levels() {
        let sg = build(&[], &[]);
        assert!(parallel_sets(&sg).is_empty());
    }

    #[test]
    fn unconstrained_items_share_one_level() {
        let sg = build(&["a", "b", "c"], &[]);
        let levels = parallel_sets(&sg);
        assert_eq!(levels, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn chain_produces_singleton_levels() {
        let sg = build(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let levels = parallel_sets(&sg);
        assert_eq!(levels, vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn diamond_middle_level_is_parallel() {
        let sg = build(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let levels = parallel_sets(&sg);
        assert_eq!(levels, vec![vec!["a"], vec!["b", "c"], vec!["d"]]);
    }

    #[test]
    fn no_level_contains_an_ordered_pair() {
        let sg = build(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "d"), ("a", "c"), ("c", "e"), ("d", "e")],
        );
        let levels = parallel_sets(&sg);

        for level in &levels {
            for first in level {
                for second in level {
                    if first == second {
                        continue;
                    }
                    let a = sg.node_index(first).unwrap();
                    let b = sg.node_index(second).unwrap();
                    assert!(
                        !petgraph::algo::has_path_connecting(&sg.graph, a, b, None),
                        "{first} and {second} share a level but are ordered"
                    );
                }
            }
        }
    }

    #[test]
    fn deep_item_lands_at_longest_path_depth() {
        // a -> c and a -> b -> c: c sits at depth 2, not 1.
        let sg = build(&["a", "b", "c"], &[("a", "c"), ("a", "b"), ("b", "c")]);
        let levels = parallel_sets(&sg);
        assert_eq!(levels, vec![vec!["a"], vec!["b"], vec!["c"]]);
    }
}
