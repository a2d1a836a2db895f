#![forbid(unsafe_code)]
//! sinew-core: work item model, workflow transitions, and the dependency
//! graph.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums on the public surface, mapped to
//!   machine-readable codes in [`error::ErrorCode`].
//! - **Logging**: `tracing` macros (`debug!`, `trace!`) for breadcrumbs;
//!   failed invariant checks are returned, never logged-and-ignored.

pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod rules;
pub mod snapshot;
pub mod store;
pub mod validator;

pub use config::EngineConfig;
pub use error::ErrorCode;
pub use graph::{DependencyGraph, GraphError};
pub use model::{
    BlockedFlag, DependencyEdge, DependencyKind, HistoryEntry, ItemKind, NewWorkItem, Priority,
    RelationKind, RelationshipEdge, WorkItem, WorkflowState,
};
pub use snapshot::{ProjectSnapshot, SnapshotError};
pub use store::{InMemoryStore, ItemStore, StoreError};
pub use validator::{TransitionContext, TransitionError, TransitionValidator};
