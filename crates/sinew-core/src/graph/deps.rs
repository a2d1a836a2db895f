//! The dependency and relationship graph over work item ids.
//!
//! # Overview
//!
//! Holds every typed edge for one project and enforces the structural
//! invariants at insertion time:
//!
//! - the ordering subgraph (blocks / depends_on / follows / precedes,
//!   normalized to "must finish before" direction) stays acyclic;
//! - parent/child edges form a forest (single parent, no hierarchy cycles).
//!
//! # Design
//!
//! - **DFS-based cycle prevention**: before committing an ordering edge,
//!   search for a path from the normalized target back to the normalized
//!   source. Finding one means the new edge would close a cycle; the
//!   rejection carries the full cycle path for diagnostics, and the graph
//!   is left untouched.
//! - **On-demand traversal**: transitive closure queries walk the edge set
//!   when asked. Nothing is maintained incrementally, so there is no
//!   invalidation logic; callers that need repeated closures cache results
//!   themselves and drop the cache on mutation.
//! - **Foreign ids allowed**: endpoints do not have to exist in the item
//!   store. Cross-team edges reference items owned elsewhere; the graph
//!   treats all ids uniformly.
//!
//! Both checks are O(V+E) per insertion, which is fine for the expected
//! graph sizes (hundreds to low thousands of items per project).

#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::model::edge::{DependencyEdge, DependencyKind, RelationKind, RelationshipEdge};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from graph mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Adding the edge would close a cycle in the ordering subgraph (or in
    /// the parent/child forest). `cycle` lists the ids along the loop,
    /// starting and ending at the same id.
    #[error("cycle detected: {}", cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    /// A second parent edge for the same child was rejected.
    #[error("item '{child}' already has parent '{existing}'")]
    DuplicateParent { child: String, existing: String },

    /// The edge to remove does not exist.
    #[error("edge not found: {from_id} -> {target}")]
    EdgeNotFound { from_id: String, target: String },
}

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

/// Directed, typed graph over work item ids.
///
/// Edges are held in ordered sets so iteration (and thus serialization and
/// cycle reporting) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    deps: BTreeSet<DependencyEdge>,
    rels: BTreeSet<RelationshipEdge>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from edge lists without invariant checks.
    ///
    /// Snapshot restore uses this and then runs [`Self::verify`]; everything
    /// else must go through [`Self::add_dependency`] /
    /// [`Self::add_relationship`].
    #[must_use]
    pub fn from_edges_unchecked(
        deps: impl IntoIterator<Item = DependencyEdge>,
        rels: impl IntoIterator<Item = RelationshipEdge>,
    ) -> Self {
        Self {
            deps: deps.into_iter().collect(),
            rels: rels.into_iter().collect(),
        }
    }

    // -- mutation -----------------------------------------------------------

    /// Add a dependency edge, rejecting ordering cycles before commit.
    ///
    /// Re-adding an existing edge is a no-op. Self-edges are reported as
    /// the trivial cycle `[id, id]`.
    ///
    /// # Errors
    ///
    /// [`GraphError::CycleDetected`] with the full cycle path if the edge
    /// would close a loop in the ordering subgraph. The graph is unchanged
    /// on error.
    pub fn add_dependency(&mut self, edge: DependencyEdge) -> Result<(), GraphError> {
        if edge.source == edge.target {
            return Err(GraphError::CycleDetected {
                cycle: vec![edge.source.clone(), edge.source.clone()],
            });
        }

        if self.deps.contains(&edge) {
            return Ok(());
        }

        if let Some((first, second)) = edge.ordered() {
            if let Some(cycle) = self.find_ordering_cycle(first, second) {
                tracing::debug!(edge = %edge, "dependency rejected: would close cycle");
                return Err(GraphError::CycleDetected { cycle });
            }
        }

        self.deps.insert(edge);
        Ok(())
    }

    /// Remove a dependency edge.
    ///
    /// # Errors
    ///
    /// [`GraphError::EdgeNotFound`] if the exact (source, target, kind)
    /// triple is not present.
    pub fn remove_dependency(&mut self, edge: &DependencyEdge) -> Result<(), GraphError> {
        if self.deps.remove(edge) {
            Ok(())
        } else {
            Err(GraphError::EdgeNotFound {
                from_id: edge.source.clone(),
                target: edge.target.clone(),
            })
        }
    }

    /// Add a relationship edge, enforcing the forest invariants for
    /// parent/child.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateParent`] when the child already has a
    ///   different parent.
    /// - [`GraphError::CycleDetected`] for self-edges and for re-parenting
    ///   an item under its own descendant.
    pub fn add_relationship(&mut self, edge: RelationshipEdge) -> Result<(), GraphError> {
        if edge.source == edge.target {
            return Err(GraphError::CycleDetected {
                cycle: vec![edge.source.clone(), edge.source.clone()],
            });
        }

        if self.rels.contains(&edge) {
            return Ok(());
        }

        if edge.kind == RelationKind::ParentChild {
            let (parent, child) = (&edge.source, &edge.target);
            if let Some(existing) = self.parent(child) {
                if existing != parent.as_str() {
                    return Err(GraphError::DuplicateParent {
                        child: child.clone(),
                        existing: existing.to_string(),
                    });
                }
            }
            if let Some(cycle) = self.find_hierarchy_cycle(parent, child) {
                return Err(GraphError::CycleDetected { cycle });
            }
        }

        self.rels.insert(edge);
        Ok(())
    }

    /// Remove a relationship edge.
    ///
    /// # Errors
    ///
    /// [`GraphError::EdgeNotFound`] if the triple is not present.
    pub fn remove_relationship(&mut self, edge: &RelationshipEdge) -> Result<(), GraphError> {
        if self.rels.remove(edge) {
            Ok(())
        } else {
            Err(GraphError::EdgeNotFound {
                from_id: edge.source.clone(),
                target: edge.target.clone(),
            })
        }
    }

    /// Remove every edge (dependency and relationship) incident to `id`.
    ///
    /// Returns the number of edges removed. This is the `Detach` cascade
    /// used before item deletion.
    pub fn detach(&mut self, id: &str) -> usize {
        let before = self.deps.len() + self.rels.len();
        self.deps.retain(|e| e.source != id && e.target != id);
        self.rels.retain(|e| e.source != id && e.target != id);
        before - (self.deps.len() + self.rels.len())
    }

    // -- queries ------------------------------------------------------------

    /// Returns `true` if any edge references `id`.
    pub fn has_edges(&self, id: &str) -> bool {
        self.deps.iter().any(|e| e.source == id || e.target == id)
            || self.rels.iter().any(|e| e.source == id || e.target == id)
    }

    /// All ids appearing as an endpoint of any edge.
    pub fn nodes(&self) -> BTreeSet<&str> {
        self.deps
            .iter()
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .chain(
                self.rels
                    .iter()
                    .flat_map(|e| [e.source.as_str(), e.target.as_str()]),
            )
            .collect()
    }

    /// Dependency edges in deterministic order.
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.deps.iter()
    }

    /// Relationship edges in deterministic order.
    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipEdge> {
        self.rels.iter()
    }

    /// Items that must be done before `id` may be done: sources of
    /// `blocks` edges into `id` plus targets of `depends_on` edges out of
    /// `id`. Follows/precedes order the schedule but do not gate done.
    pub fn done_prerequisites(&self, id: &str) -> BTreeSet<&str> {
        self.deps
            .iter()
            .filter_map(|e| match e.kind {
                DependencyKind::Blocks if e.target == id => Some(e.source.as_str()),
                DependencyKind::DependsOn if e.source == id => Some(e.target.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Transitive prerequisites of `id`: everything that must finish before
    /// `id`, following reversed normalized edges of the given kinds.
    pub fn ancestors(&self, id: &str, kinds: &[DependencyKind]) -> BTreeSet<String> {
        self.reachable(id, kinds, Direction::Incoming)
    }

    /// Transitive dependents of `id`: everything that must finish after
    /// `id`, following normalized edges of the given kinds.
    pub fn descendants(&self, id: &str, kinds: &[DependencyKind]) -> BTreeSet<String> {
        self.reachable(id, kinds, Direction::Outgoing)
    }

    /// Detect every cycle in the subgraph of the given kinds.
    ///
    /// Returns one path per back edge found, each starting and ending at
    /// the same id. Empty means the subgraph is a DAG. Used as the restore
    /// verification sweep; under normal operation [`Self::add_dependency`]
    /// keeps this empty.
    pub fn detect_cycles(&self, kinds: &[DependencyKind]) -> Vec<Vec<String>> {
        let adjacency = self.ordering_adjacency(kinds);
        let mut nodes: Vec<&str> = adjacency.keys().copied().collect();
        nodes.sort_unstable();

        let mut color: HashMap<&str, Color> = HashMap::new();
        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut cycles = Vec::new();

        for &node in &nodes {
            if !color.contains_key(node) {
                dfs_collect_cycles(node, &adjacency, &mut color, &mut parent, &mut cycles);
            }
        }

        cycles
    }

    /// Verify the structural invariants wholesale: ordering acyclicity and
    /// the single-parent forest. Returns the first violation found.
    ///
    /// # Errors
    ///
    /// [`GraphError::CycleDetected`] or [`GraphError::DuplicateParent`].
    pub fn verify(&self) -> Result<(), GraphError> {
        if let Some(cycle) = self.detect_cycles(&DependencyKind::ORDERING).into_iter().next() {
            return Err(GraphError::CycleDetected { cycle });
        }

        let mut parent_of: HashMap<&str, &str> = HashMap::new();
        for edge in self.rels.iter().filter(|e| e.kind == RelationKind::ParentChild) {
            if let Some(existing) = parent_of.insert(&edge.target, &edge.source) {
                if existing != edge.source {
                    return Err(GraphError::DuplicateParent {
                        child: edge.target.clone(),
                        existing: existing.to_string(),
                    });
                }
            }
        }

        // A parent chain that loops would also be caught here.
        for child in parent_of.keys() {
            let mut seen = HashSet::new();
            let mut current = *child;
            while let Some(&up) = parent_of.get(current) {
                if !seen.insert(current) {
                    return Err(GraphError::CycleDetected {
                        cycle: vec![current.to_string(), current.to_string()],
                    });
                }
                current = up;
            }
        }

        Ok(())
    }

    // -- hierarchy ----------------------------------------------------------

    /// The parent of `id`, if any.
    pub fn parent(&self, id: &str) -> Option<&str> {
        self.rels
            .iter()
            .find(|e| e.kind == RelationKind::ParentChild && e.target == id)
            .map(|e| e.source.as_str())
    }

    /// Direct children of `id` in deterministic order.
    pub fn children(&self, id: &str) -> Vec<&str> {
        self.rels
            .iter()
            .filter(|e| e.kind == RelationKind::ParentChild && e.source == id)
            .map(|e| e.target.as_str())
            .collect()
    }

    /// The canonical item `id` duplicates, if a duplicate-of edge exists.
    pub fn duplicate_of(&self, id: &str) -> Option<&str> {
        self.rels
            .iter()
            .find(|e| e.kind == RelationKind::Duplicate && e.source == id)
            .map(|e| e.target.as_str())
    }

    /// Returns `true` if `id` carries a duplicate-of edge.
    pub fn is_duplicate(&self, id: &str) -> bool {
        self.duplicate_of(id).is_some()
    }

    // -- internals ----------------------------------------------------------

    /// Forward adjacency of the normalized ordering subgraph restricted to
    /// `kinds`. Every endpoint gets an entry so traversals see isolated
    /// nodes too.
    fn ordering_adjacency(&self, kinds: &[DependencyKind]) -> HashMap<&str, Vec<&str>> {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in self.deps.iter().filter(|e| kinds.contains(&e.kind)) {
            let Some((first, second)) = edge.ordered() else {
                continue;
            };
            adjacency.entry(first).or_default().push(second);
            adjacency.entry(second).or_default();
        }
        for successors in adjacency.values_mut() {
            successors.sort_unstable();
            successors.dedup();
        }
        adjacency
    }

    /// Search for an existing path `second -> ... -> first` in the full
    /// ordering subgraph. If found, adding `first -> second` closes a
    /// cycle; the returned path starts at `first` and loops back to it.
    fn find_ordering_cycle(&self, first: &str, second: &str) -> Option<Vec<String>> {
        let adjacency = self.ordering_adjacency(&DependencyKind::ORDERING);

        let mut visited: HashSet<&str> = HashSet::new();
        let mut parent: HashMap<&str, &str> = HashMap::new();
        if !dfs_find_path(second, first, &adjacency, &mut visited, &mut parent) {
            return None;
        }

        // Reconstruct second -> ... -> first from the parent map, then wrap
        // with the new edge to present first -> second -> ... -> first.
        let mut chain = vec![first];
        let mut current = first;
        while current != second {
            current = parent.get(current).copied()?;
            chain.push(current);
        }
        chain.push(first);
        chain.reverse();
        // chain is now [first, second, ..., first] read along edge direction.
        Some(chain.into_iter().map(str::to_string).collect())
    }

    /// Walk `parent`'s ancestor chain; hitting `child` means the new edge
    /// would make `child` its own ancestor.
    fn find_hierarchy_cycle(&self, parent: &str, child: &str) -> Option<Vec<String>> {
        let mut path = vec![child.to_string(), parent.to_string()];
        let mut current = parent;
        let mut seen: HashSet<&str> = HashSet::new();
        while let Some(up) = self.parent(current) {
            if !seen.insert(current) {
                break;
            }
            path.push(up.to_string());
            if up == child {
                return Some(path);
            }
            current = up;
        }
        None
    }

    fn reachable(
        &self,
        id: &str,
        kinds: &[DependencyKind],
        direction: Direction,
    ) -> BTreeSet<String> {
        let forward = self.ordering_adjacency(kinds);
        let adjacency = match direction {
            Direction::Outgoing => forward,
            Direction::Incoming => reverse_adjacency(&forward),
        };

        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(id);

        while let Some(current) = queue.pop_front() {
            for &next in adjacency.get(current).map(Vec::as_slice).unwrap_or(&[]) {
                if next != id && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        seen.into_iter().map(str::to_string).collect()
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Outgoing,
    Incoming,
}

fn reverse_adjacency<'a>(forward: &HashMap<&'a str, Vec<&'a str>>) -> HashMap<&'a str, Vec<&'a str>> {
    let mut reversed: HashMap<&str, Vec<&str>> = HashMap::new();
    for (&from, successors) in forward {
        reversed.entry(from).or_default();
        for &to in successors {
            reversed.entry(to).or_default().push(from);
        }
    }
    reversed
}

// ---------------------------------------------------------------------------
// DFS internals
// ---------------------------------------------------------------------------

/// DFS colors for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Currently on the DFS stack.
    Gray,
    /// Fully processed.
    Black,
}

/// DFS from `current` looking for `target`, recording the traversal tree in
/// `parent` so the path can be reconstructed.
fn dfs_find_path<'a>(
    current: &'a str,
    target: &str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    parent: &mut HashMap<&'a str, &'a str>,
) -> bool {
    if current == target {
        return true;
    }
    if !visited.insert(current) {
        return false;
    }

    for &next in adjacency.get(current).map(Vec::as_slice).unwrap_or(&[]) {
        if !visited.contains(next) {
            parent.insert(next, current);
            if dfs_find_path(next, target, adjacency, visited, parent) {
                return true;
            }
        } else if next == target {
            parent.insert(next, current);
            return true;
        }
    }

    false
}

/// DFS recording every back edge as a cycle path.
fn dfs_collect_cycles<'a>(
    node: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    color: &mut HashMap<&'a str, Color>,
    parent: &mut HashMap<&'a str, &'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    color.insert(node, Color::Gray);

    for &next in adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]) {
        match color.get(next) {
            None => {
                parent.insert(next, node);
                dfs_collect_cycles(next, adjacency, color, parent, cycles);
            }
            Some(Color::Gray) => {
                // Back edge node -> next with next still on the stack: the
                // loop runs next -> ... -> node -> next.
                let mut path = vec![node];
                let mut current = node;
                while current != next {
                    match parent.get(current) {
                        Some(&up) => {
                            path.push(up);
                            current = up;
                        }
                        None => break,
                    }
                }
                path.reverse();
                let mut cycle: Vec<String> = path.into_iter().map(str::to_string).collect();
                cycle.push(next.to_string());
                cycles.push(cycle);
            }
            Some(Color::Black) => {}
        }
    }

    color.insert(node, Color::Black);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(source: &str, target: &str, kind: DependencyKind) -> DependencyEdge {
        DependencyEdge::new(source, target, kind)
    }

    fn rel(source: &str, target: &str, kind: RelationKind) -> RelationshipEdge {
        RelationshipEdge::new(source, target, kind)
    }

    // -----------------------------------------------------------------------
    // Cycle prevention
    // -----------------------------------------------------------------------

    #[test]
    fn self_edge_rejected_as_trivial_cycle() {
        let mut graph = DependencyGraph::new();
        let err = graph
            .add_dependency(dep("a", "a", DependencyKind::Blocks))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                cycle: vec!["a".to_string(), "a".to_string()],
            }
        );
    }

    #[test]
    fn mutual_block_rejected_with_path() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();

        let err = graph
            .add_dependency(dep("b", "a", DependencyKind::Blocks))
            .unwrap_err();
        let GraphError::CycleDetected { cycle } = err else {
            panic!("expected cycle, got {err:?}");
        };
        assert_eq!(cycle.first().map(String::as_str), Some("b"));
        assert_eq!(cycle.last().map(String::as_str), Some("b"));
        assert_eq!(cycle.len(), 3, "b -> a -> b");
    }

    #[test]
    fn three_node_cycle_rejected_and_graph_unchanged() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("b", "c", DependencyKind::Blocks))
            .unwrap();

        let snapshot = graph.clone();
        let err = graph
            .add_dependency(dep("c", "a", DependencyKind::Blocks))
            .unwrap_err();

        let GraphError::CycleDetected { cycle } = err else {
            panic!("expected cycle, got {err:?}");
        };
        assert_eq!(cycle, vec!["c", "a", "b", "c"]);
        assert_eq!(graph, snapshot, "rejection must leave the graph unchanged");
    }

    #[test]
    fn mixed_kind_cycle_rejected() {
        // blocks(a, b) orders a before b; depends_on(a, c) orders c before a.
        // follows(c, b) orders b before c, closing b -> c -> a -> b.
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("a", "c", DependencyKind::DependsOn))
            .unwrap();

        let err = graph
            .add_dependency(dep("c", "b", DependencyKind::Follows))
            .unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected { .. }));
    }

    #[test]
    fn conflicts_with_never_cycles() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "b", DependencyKind::ConflictsWith))
            .unwrap();
        graph
            .add_dependency(dep("b", "a", DependencyKind::ConflictsWith))
            .unwrap();
        assert!(graph.detect_cycles(&DependencyKind::ALL).is_empty());
    }

    #[test]
    fn duplicate_edge_is_noop() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();
        assert_eq!(graph.dependencies().count(), 1);
    }

    #[test]
    fn long_chain_cycle_detected() {
        let mut graph = DependencyGraph::new();
        let names: Vec<String> = (0..50).map(|i| format!("n{i}")).collect();
        for window in names.windows(2) {
            graph
                .add_dependency(dep(&window[0], &window[1], DependencyKind::Blocks))
                .unwrap();
        }

        let err = graph
            .add_dependency(dep(&names[49], &names[0], DependencyKind::Blocks))
            .unwrap_err();
        let GraphError::CycleDetected { cycle } = err else {
            panic!("expected cycle");
        };
        assert_eq!(cycle.len(), 51, "50 distinct nodes plus the repeat");
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("a", "c", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("b", "d", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("c", "d", DependencyKind::Blocks))
            .unwrap();
        assert!(graph.detect_cycles(&DependencyKind::ORDERING).is_empty());
    }

    // -----------------------------------------------------------------------
    // Closure queries
    // -----------------------------------------------------------------------

    #[test]
    fn ancestors_and_descendants_follow_normalized_direction() {
        let mut graph = DependencyGraph::new();
        // a before b (blocks), c before b (b depends_on c).
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("b", "c", DependencyKind::DependsOn))
            .unwrap();
        // b before d.
        graph
            .add_dependency(dep("b", "d", DependencyKind::Precedes))
            .unwrap();

        let ancestors = graph.ancestors("b", &DependencyKind::ORDERING);
        assert!(ancestors.contains("a"));
        assert!(ancestors.contains("c"));
        assert!(!ancestors.contains("d"));

        let descendants = graph.descendants("a", &DependencyKind::ORDERING);
        assert!(descendants.contains("b"));
        assert!(descendants.contains("d"));
        assert!(!descendants.contains("c"));
    }

    #[test]
    fn closure_respects_kind_filter() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("b", "c", DependencyKind::Precedes))
            .unwrap();

        let blocks_only = graph.descendants("a", &[DependencyKind::Blocks]);
        assert!(blocks_only.contains("b"));
        assert!(!blocks_only.contains("c"));

        let all = graph.descendants("a", &DependencyKind::ORDERING);
        assert!(all.contains("c"));
    }

    #[test]
    fn closure_of_unknown_id_is_empty() {
        let graph = DependencyGraph::new();
        assert!(graph.ancestors("ghost", &DependencyKind::ORDERING).is_empty());
        assert!(graph.descendants("ghost", &DependencyKind::ORDERING).is_empty());
    }

    #[test]
    fn done_prerequisites_cover_blocks_and_depends_on() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "x", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("x", "b", DependencyKind::DependsOn))
            .unwrap();
        graph
            .add_dependency(dep("c", "x", DependencyKind::Precedes))
            .unwrap();

        let prereqs = graph.done_prerequisites("x");
        assert!(prereqs.contains("a"), "blocks source gates done");
        assert!(prereqs.contains("b"), "depends_on target gates done");
        assert!(!prereqs.contains("c"), "precedes does not gate done");
    }

    // -----------------------------------------------------------------------
    // Removal and detach
    // -----------------------------------------------------------------------

    #[test]
    fn remove_missing_edge_errors() {
        let mut graph = DependencyGraph::new();
        let err = graph
            .remove_dependency(&dep("a", "b", DependencyKind::Blocks))
            .unwrap_err();
        assert!(matches!(err, GraphError::EdgeNotFound { .. }));
    }

    #[test]
    fn remove_then_readd_reversed_is_legal() {
        let mut graph = DependencyGraph::new();
        let forward = dep("a", "b", DependencyKind::Blocks);
        graph.add_dependency(forward.clone()).unwrap();
        graph.remove_dependency(&forward).unwrap();
        graph
            .add_dependency(dep("b", "a", DependencyKind::Blocks))
            .unwrap();
    }

    #[test]
    fn detach_removes_all_incident_edges() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("b", "c", DependencyKind::Precedes))
            .unwrap();
        graph
            .add_relationship(rel("p", "b", RelationKind::ParentChild))
            .unwrap();

        assert!(graph.has_edges("b"));
        let removed = graph.detach("b");
        assert_eq!(removed, 3);
        assert!(!graph.has_edges("b"));
        assert!(!graph.has_edges("a"));
    }

    // -----------------------------------------------------------------------
    // Hierarchy invariants
    // -----------------------------------------------------------------------

    #[test]
    fn single_parent_enforced() {
        let mut graph = DependencyGraph::new();
        graph
            .add_relationship(rel("p1", "c", RelationKind::ParentChild))
            .unwrap();

        let err = graph
            .add_relationship(rel("p2", "c", RelationKind::ParentChild))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateParent {
                child: "c".to_string(),
                existing: "p1".to_string(),
            }
        );

        // Re-adding the same parent edge is a no-op.
        graph
            .add_relationship(rel("p1", "c", RelationKind::ParentChild))
            .unwrap();
    }

    #[test]
    fn hierarchy_cycle_rejected() {
        let mut graph = DependencyGraph::new();
        graph
            .add_relationship(rel("a", "b", RelationKind::ParentChild))
            .unwrap();
        graph
            .add_relationship(rel("b", "c", RelationKind::ParentChild))
            .unwrap();

        // c is a descendant of a; making c the parent of a loops the forest.
        let err = graph
            .add_relationship(rel("c", "a", RelationKind::ParentChild))
            .unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected { .. }));
    }

    #[test]
    fn parent_children_duplicate_queries() {
        let mut graph = DependencyGraph::new();
        graph
            .add_relationship(rel("p", "c1", RelationKind::ParentChild))
            .unwrap();
        graph
            .add_relationship(rel("p", "c2", RelationKind::ParentChild))
            .unwrap();
        graph
            .add_relationship(rel("d", "canon", RelationKind::Duplicate))
            .unwrap();

        assert_eq!(graph.parent("c1"), Some("p"));
        assert_eq!(graph.parent("p"), None);
        assert_eq!(graph.children("p"), vec!["c1", "c2"]);
        assert_eq!(graph.duplicate_of("d"), Some("canon"));
        assert!(graph.is_duplicate("d"));
        assert!(!graph.is_duplicate("canon"));
    }

    // -----------------------------------------------------------------------
    // detect_cycles / verify
    // -----------------------------------------------------------------------

    #[test]
    fn detect_cycles_empty_on_dag() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("a", "b", DependencyKind::Blocks))
            .unwrap();
        graph
            .add_dependency(dep("b", "c", DependencyKind::Blocks))
            .unwrap();
        assert!(graph.detect_cycles(&DependencyKind::ORDERING).is_empty());
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn detect_cycles_finds_unchecked_loop() {
        let graph = DependencyGraph::from_edges_unchecked(
            [
                dep("a", "b", DependencyKind::Blocks),
                dep("b", "a", DependencyKind::Blocks),
            ],
            [],
        );
        let cycles = graph.detect_cycles(&DependencyKind::ORDERING);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].first(), cycles[0].last());
        assert!(graph.verify().is_err());
    }

    #[test]
    fn verify_catches_multi_parent_from_unchecked() {
        let graph = DependencyGraph::from_edges_unchecked(
            [],
            [
                rel("p1", "c", RelationKind::ParentChild),
                rel("p2", "c", RelationKind::ParentChild),
            ],
        );
        assert!(matches!(
            graph.verify(),
            Err(GraphError::DuplicateParent { .. })
        ));
    }

    #[test]
    fn foreign_endpoints_are_valid_nodes() {
        let mut graph = DependencyGraph::new();
        graph
            .add_dependency(dep("local", "other-project:item", DependencyKind::Blocks))
            .unwrap();
        assert!(graph.nodes().contains("other-project:item"));
    }

    // -----------------------------------------------------------------------
    // Property tests
    // -----------------------------------------------------------------------

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_kind() -> impl Strategy<Value = DependencyKind> {
            prop_oneof![
                Just(DependencyKind::Blocks),
                Just(DependencyKind::DependsOn),
                Just(DependencyKind::Follows),
                Just(DependencyKind::Precedes),
            ]
        }

        fn arb_edge() -> impl Strategy<Value = DependencyEdge> {
            (0..12u8, 0..12u8, arb_kind())
                .prop_map(|(s, t, kind)| dep(&format!("n{s}"), &format!("n{t}"), kind))
        }

        proptest! {
            /// No sequence of accepted inserts ever leaves a cycle behind,
            /// and every rejected insert leaves the graph byte-identical.
            #[test]
            fn inserts_never_create_cycles(edges in proptest::collection::vec(arb_edge(), 1..60)) {
                let mut graph = DependencyGraph::new();
                for edge in edges {
                    let before = graph.clone();
                    if graph.add_dependency(edge).is_err() {
                        prop_assert_eq!(&graph, &before);
                    }
                    prop_assert!(graph.detect_cycles(&DependencyKind::ORDERING).is_empty());
                }
            }

            /// Closure queries agree: `a` is an ancestor of `b` iff `b` is a
            /// descendant of `a`.
            #[test]
            fn closure_symmetry(edges in proptest::collection::vec(arb_edge(), 1..40)) {
                let mut graph = DependencyGraph::new();
                for edge in edges {
                    let _ = graph.add_dependency(edge);
                }

                let nodes: Vec<String> =
                    graph.nodes().iter().map(|s| (*s).to_string()).collect();
                for a in &nodes {
                    for b in graph.descendants(a, &DependencyKind::ORDERING) {
                        prop_assert!(
                            graph.ancestors(&b, &DependencyKind::ORDERING).contains(a),
                            "{a} -> {b} but no reverse closure"
                        );
                    }
                }
            }
        }
    }
}
