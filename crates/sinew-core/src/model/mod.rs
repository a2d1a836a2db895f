//! Core data model: work items, workflow states, and typed edges.

pub mod edge;
pub mod history;
pub mod item;

pub use edge::{DependencyEdge, DependencyKind, RelationKind, RelationshipEdge};
pub use history::HistoryEntry;
pub use item::{
    BlockedFlag, InvalidTransition, ItemKind, MetadataError, NewWorkItem, ParseEnumError,
    Priority, WorkItem, WorkflowState, validate_metadata,
};
