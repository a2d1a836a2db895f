//! Typed edges between work items.
//!
//! Two taxonomies, kept separate on purpose:
//!
//! - **Dependency edges** carry ordering/blocking semantics and feed the
//!   acyclicity invariant and the scheduler.
//! - **Relationship edges** are organizational: hierarchy (parent/child),
//!   duplication, and loose association.
//!
//! Dependency direction is normalized for graph work via
//! [`DependencyKind::ordered`]: an ordering pair `(u, v)` always means
//! "`u` must finish before `v`".

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dependency edge types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// `A blocks B`: B cannot reach done while A is not done.
    Blocks,
    /// `A depends_on B`: A cannot reach done while B is not done.
    DependsOn,
    /// `A follows B`: A is scheduled after B. Ordering only, no done gate.
    Follows,
    /// `A precedes B`: A is scheduled before B. Ordering only, no done gate.
    Precedes,
    /// Mutual-exclusion marker. No ordering, no done gate.
    ConflictsWith,
}

impl DependencyKind {
    pub const ALL: [Self; 5] = [
        Self::Blocks,
        Self::DependsOn,
        Self::Follows,
        Self::Precedes,
        Self::ConflictsWith,
    ];

    /// The kinds that participate in ordering (and thus in the acyclicity
    /// invariant and the schedule DAG).
    pub const ORDERING: [Self; 4] = [
        Self::Blocks,
        Self::DependsOn,
        Self::Follows,
        Self::Precedes,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::DependsOn => "depends_on",
            Self::Follows => "follows",
            Self::Precedes => "precedes",
            Self::ConflictsWith => "conflicts_with",
        }
    }

    /// Returns `true` if this kind imposes an ordering constraint.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        !matches!(self, Self::ConflictsWith)
    }

    /// Normalize an edge of this kind into "must finish before" direction.
    ///
    /// Returns `(first, second)` meaning `first` finishes before `second`
    /// starts, or `None` for non-ordering kinds.
    #[must_use]
    pub fn ordered<'a>(self, source: &'a str, target: &'a str) -> Option<(&'a str, &'a str)> {
        match self {
            Self::Blocks | Self::Precedes => Some((source, target)),
            Self::DependsOn | Self::Follows => Some((target, source)),
            Self::ConflictsWith => None,
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship edge types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// `(parent, child)`. Forms a forest; a child has at most one parent.
    ParentChild,
    /// `(duplicate, canonical)`: source is a duplicate of target.
    Duplicate,
    /// Informational association.
    Related,
}

impl RelationKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::ParentChild => "parent_child",
            Self::Duplicate => "duplicate",
            Self::Related => "related",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub kind: DependencyKind,
}

impl DependencyEdge {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }

    /// Normalized "must finish before" pair, if this edge orders anything.
    #[must_use]
    pub fn ordered(&self) -> Option<(&str, &str)> {
        self.kind.ordered(&self.source, &self.target)
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.source, self.kind, self.target)
    }
}

/// A directed, typed relationship edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
}

impl RelationshipEdge {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

impl fmt::Display for RelationshipEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.source, self.kind, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_normalization() {
        assert_eq!(
            DependencyKind::Blocks.ordered("a", "b"),
            Some(("a", "b")),
            "a blocks b: a finishes first"
        );
        assert_eq!(
            DependencyKind::DependsOn.ordered("a", "b"),
            Some(("b", "a")),
            "a depends_on b: b finishes first"
        );
        assert_eq!(DependencyKind::Precedes.ordered("a", "b"), Some(("a", "b")));
        assert_eq!(DependencyKind::Follows.ordered("a", "b"), Some(("b", "a")));
        assert_eq!(DependencyKind::ConflictsWith.ordered("a", "b"), None);
    }

    #[test]
    fn ordering_kinds_match_predicate() {
        for kind in DependencyKind::ALL {
            assert_eq!(
                kind.is_ordering(),
                DependencyKind::ORDERING.contains(&kind),
                "{kind}"
            );
        }
    }

    #[test]
    fn edge_json_roundtrip() {
        let edge = DependencyEdge::new("a", "b", DependencyKind::DependsOn);
        let json = serde_json::to_string(&edge).unwrap();
        assert!(json.contains("\"depends_on\""), "json: {json}");
        let back: DependencyEdge = serde_json::from_str(&json).unwrap();
        assert_eq!(edge, back);

        let rel = RelationshipEdge::new("p", "c", RelationKind::ParentChild);
        let json = serde_json::to_string(&rel).unwrap();
        assert!(json.contains("\"parent_child\""), "json: {json}");
        let back: RelationshipEdge = serde_json::from_str(&json).unwrap();
        assert_eq!(rel, back);
    }
}
