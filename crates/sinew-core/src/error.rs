use std::fmt;

/// Machine-readable error codes for API callers and automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    CorruptSnapshot,
    ProjectNotFound,
    ItemNotFound,
    DuplicateItem,
    EdgeNotFound,
    InvalidTransition,
    BlockedTransition,
    ValidationRuleFailed,
    UnknownKind,
    InvalidMetadata,
    EdgesAttached,
    CycleDetected,
    DuplicateParent,
    CrossProject,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::CorruptSnapshot => "E1002",
            Self::ProjectNotFound => "E1003",
            Self::ItemNotFound => "E2001",
            Self::DuplicateItem => "E2009",
            Self::EdgeNotFound => "E2002",
            Self::InvalidTransition => "E2003",
            Self::BlockedTransition => "E2004",
            Self::ValidationRuleFailed => "E2005",
            Self::UnknownKind => "E2006",
            Self::InvalidMetadata => "E2007",
            Self::EdgesAttached => "E2008",
            Self::CycleDetected => "E3001",
            Self::DuplicateParent => "E3002",
            Self::CrossProject => "E3003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config parse error",
            Self::CorruptSnapshot => "Snapshot contains an inconsistent graph",
            Self::ProjectNotFound => "Project not found",
            Self::ItemNotFound => "Work item not found",
            Self::DuplicateItem => "Work item id already exists",
            Self::EdgeNotFound => "Edge not found",
            Self::InvalidTransition => "Invalid workflow transition",
            Self::BlockedTransition => "Transition blocked by dependencies",
            Self::ValidationRuleFailed => "Custom validation rule failed",
            Self::UnknownKind => "Unknown work item kind",
            Self::InvalidMetadata => "Metadata limits exceeded",
            Self::EdgesAttached => "Item still referenced by edges",
            Self::CycleDetected => "Cycle would be created",
            Self::DuplicateParent => "Item already has a parent",
            Self::CrossProject => "Cross-project edge not flagged",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the engine config and retry."),
            Self::CorruptSnapshot => {
                Some("The stored edge set already contains a cycle; repair it upstream.")
            }
            Self::ProjectNotFound | Self::ItemNotFound | Self::EdgeNotFound => None,
            Self::DuplicateItem => Some("Supply a different id or omit it to auto-generate."),
            Self::InvalidTransition => Some(
                "Follow valid transitions: found -> triaged -> to_do -> in_progress -> in_test -> done -> released.",
            ),
            Self::BlockedTransition => Some("Complete the blocking items first."),
            Self::ValidationRuleFailed => Some("Satisfy the named rule or remove it from config."),
            Self::UnknownKind => Some("Use a built-in kind or add the custom kind to config."),
            Self::InvalidMetadata => Some("Reduce metadata entry count or entry size."),
            Self::EdgesAttached => Some("Detach edges first, or pass the detach cascade policy."),
            Self::CycleDetected => Some("Remove/adjust dependency links to keep the graph acyclic."),
            Self::DuplicateParent => Some("Remove the existing parent link before re-parenting."),
            Self::CrossProject => Some("Mark the edge as a cross-team dependency to allow it."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
