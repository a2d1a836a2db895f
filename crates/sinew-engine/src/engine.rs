//! The workflow engine: single entry point for external callers.
//!
//! # Overview
//!
//! `WorkflowEngine` owns per-project state (item store, dependency graph,
//! history log) behind per-project locks and orchestrates the core parts:
//! the transition validator, the graph invariants, and the scheduling
//! analysis. All parts are constructor-injected data, not globals, so the
//! engine is fully testable in isolation.
//!
//! Mutations hold the project lock for the whole logical operation,
//! including the cycle-detection traversal. Report queries clone the
//! project's nodes and edges under the lock and compute outside it, so
//! analytics never block writers longer than a snapshot copy.
//!
//! State transitions never mutate edges; edge operations never mutate
//! item state. History is append-only.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};
use uuid::Uuid;

use sinew_core::config::EngineConfig;
use sinew_core::error::ErrorCode;
use sinew_core::graph::deps::{DependencyGraph, GraphError};
use sinew_core::model::edge::{DependencyEdge, DependencyKind, RelationshipEdge};
use sinew_core::model::history::HistoryEntry;
use sinew_core::model::item::{
    BlockedFlag, MetadataError, NewWorkItem, WorkItem, WorkflowState, validate_metadata,
};
use sinew_core::snapshot::{ProjectSnapshot, SnapshotError};
use sinew_core::store::{InMemoryStore, ItemStore, StoreError};
use sinew_core::validator::{TransitionContext, TransitionError, TransitionValidator};
use sinew_schedule::build::{ScheduleError, ScheduleGraph};
use sinew_schedule::critical_path::{CriticalPathResult, compute_critical_path};
use sinew_schedule::impact::{ImpactResult, impact};
use sinew_schedule::parallel::parallel_sets;

use crate::events::{EngineEvent, EventSink};
use crate::lock::ProjectRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Typed errors returned to the immediate caller. The excluded API layer
/// decides how to surface them; the engine never logs, retries, or queues
/// a failed invariant check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("project not found: '{0}'")]
    ProjectNotFound(String),

    #[error("work item not found: '{0}'")]
    ItemNotFound(String),

    #[error("work item id already exists: '{0}'")]
    DuplicateItem(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A dependency or hierarchy constraint prevents the transition.
    #[error("cannot move '{item}' to {target}: blocked by {}", blocking.join(", "))]
    BlockedTransition {
        item: String,
        target: WorkflowState,
        /// The unmet blocking items, sorted.
        blocking: Vec<String>,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("unknown work item kind '{0}': not built-in and not configured")]
    UnknownKind(String),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("cannot remove '{id}': {count} edges still attached")]
    EdgesAttached { id: String, count: usize },

    #[error(
        "edge '{from_id}' -> '{target}' spans projects '{source_project}' and '{target_project}' without the cross-team flag"
    )]
    CrossProject {
        from_id: String,
        target: String,
        source_project: String,
        target_project: String,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The schedule input was cyclic. Unreachable through engine-mediated
    /// mutation; indicates external corruption.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl EngineError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ProjectNotFound(_) => ErrorCode::ProjectNotFound,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::DuplicateItem(_) => ErrorCode::DuplicateItem,
            Self::Transition(TransitionError::Invalid { .. }) => ErrorCode::InvalidTransition,
            Self::Transition(TransitionError::RuleFailed { .. }) => {
                ErrorCode::ValidationRuleFailed
            }
            Self::BlockedTransition { .. } => ErrorCode::BlockedTransition,
            Self::Graph(GraphError::CycleDetected { .. })
            | Self::Schedule(ScheduleError::CyclicGraph { .. }) => ErrorCode::CycleDetected,
            Self::Graph(GraphError::DuplicateParent { .. }) => ErrorCode::DuplicateParent,
            Self::Graph(GraphError::EdgeNotFound { .. }) => ErrorCode::EdgeNotFound,
            Self::UnknownKind(_) => ErrorCode::UnknownKind,
            Self::Metadata(_) => ErrorCode::InvalidMetadata,
            Self::EdgesAttached { .. } => ErrorCode::EdgesAttached,
            Self::CrossProject { .. } => ErrorCode::CrossProject,
            Self::Snapshot(_) => ErrorCode::CorruptSnapshot,
            Self::Schedule(ScheduleError::UnknownItem(_)) => ErrorCode::ItemNotFound,
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Parameters accompanying a transition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub actor: String,
    pub comment: Option<String>,
    /// Ask for the emergency bypass (critical hotfix straight to
    /// in_progress). Honored only when the item qualifies.
    pub bypass: bool,
}

impl TransitionRequest {
    #[must_use]
    pub fn by(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            comment: None,
            bypass: false,
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub const fn with_bypass(mut self) -> Self {
        self.bypass = true;
        self
    }
}

impl Default for TransitionRequest {
    fn default() -> Self {
        Self::by("system")
    }
}

/// What to do with attached edges when removing an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Refuse removal while any edge references the item.
    #[default]
    Refuse,
    /// Detach all incident edges, then remove.
    Detach,
}

// ---------------------------------------------------------------------------
// Per-project state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Project<S> {
    store: S,
    graph: DependencyGraph,
    history: HashMap<String, Vec<HistoryEntry>>,
    last_critical_path: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// The engine. One instance serves any number of projects; see the module
/// docs for the locking discipline.
pub struct WorkflowEngine<S: ItemStore = InMemoryStore> {
    config: EngineConfig,
    validator: TransitionValidator,
    projects: ProjectRegistry<Project<S>>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl<S: ItemStore> WorkflowEngine<S> {
    /// Build an engine from configuration. Custom rules in the config
    /// become the validator's rule list, in order.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let validator = TransitionValidator::new(config.rules.clone());
        Self {
            config,
            validator,
            projects: ProjectRegistry::new(),
            sinks: Vec::new(),
        }
    }

    /// Register an event sink. Sinks receive every outbound event from this
    /// engine, in emission order, on the mutating caller's thread.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Create an empty project. Idempotent.
    pub fn create_project(&self, project: &str) {
        self.projects.ensure(project, Project::default);
    }

    /// Known project ids, sorted.
    #[must_use]
    pub fn projects(&self) -> Vec<String> {
        self.projects.ids()
    }

    // -- item lifecycle -----------------------------------------------------

    /// Create a work item. The project is created on first use; the item id
    /// is generated when the caller does not supply one.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownKind`], [`EngineError::Metadata`], or
    /// [`EngineError::DuplicateItem`].
    #[instrument(skip(self, new))]
    pub fn create_item(&self, project: &str, new: NewWorkItem) -> Result<WorkItem, EngineError> {
        if !self.config.accepts_kind(&new.kind) {
            return Err(EngineError::UnknownKind(new.kind.to_string()));
        }
        validate_metadata(&new.metadata)?;

        let now = Utc::now();
        let item = WorkItem {
            id: new.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: new.title,
            description: new.description,
            kind: new.kind,
            priority: new.priority,
            state: new.state.unwrap_or(WorkflowState::Found),
            assignee: new.assignee,
            estimate: new.estimate,
            blocked: None,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        };

        let handle = self.projects.ensure(project, Project::default);
        let mut state = match handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match state.store.insert(item.clone()) {
            Ok(()) => Ok(item),
            Err(StoreError::DuplicateId(id) | StoreError::NotFound(id)) => {
                Err(EngineError::DuplicateItem(id))
            }
        }
    }

    /// Fetch a copy of an item.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`] or [`EngineError::ItemNotFound`].
    pub fn get_item(&self, project: &str, id: &str) -> Result<WorkItem, EngineError> {
        self.with_project(project, |p| {
            p.store
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))
        })?
    }

    /// The item's transition history, oldest first.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`] or [`EngineError::ItemNotFound`].
    pub fn history(&self, project: &str, id: &str) -> Result<Vec<HistoryEntry>, EngineError> {
        self.with_project(project, |p| {
            if !p.store.contains(id) {
                return Err(EngineError::ItemNotFound(id.to_string()));
            }
            Ok(p.history.get(id).cloned().unwrap_or_default())
        })?
    }

    /// Targets the item can legally move to right now (static graph plus
    /// custom rules; bypass excluded).
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`] or [`EngineError::ItemNotFound`].
    pub fn available_transitions(
        &self,
        project: &str,
        id: &str,
    ) -> Result<Vec<WorkflowState>, EngineError> {
        self.with_project(project, |p| {
            let item = p
                .store
                .get(id)
                .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
            Ok(self
                .validator
                .available_transitions(item, p.graph.is_duplicate(id)))
        })?
    }

    /// Request a state transition.
    ///
    /// Order of checks: load, dependency/hierarchy gate (for done),
    /// validator (static graph, bypass, custom rules), then commit plus an
    /// immutable history entry. A transition never mutates edges.
    ///
    /// # Errors
    ///
    /// [`EngineError::BlockedTransition`] naming the unmet blocking items,
    /// [`EngineError::Transition`] from the validator, or the usual
    /// not-found errors.
    #[instrument(skip(self, request))]
    pub fn request_transition(
        &self,
        project: &str,
        id: &str,
        target: WorkflowState,
        request: TransitionRequest,
    ) -> Result<WorkItem, EngineError> {
        let (item, event) = self.with_project(project, |p| {
            let item = p
                .store
                .get(id)
                .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
            let from = item.state;

            if target == WorkflowState::Done {
                let blocking = unmet_blockers(p, id);
                if !blocking.is_empty() {
                    return Err(EngineError::BlockedTransition {
                        item: id.to_string(),
                        target,
                        blocking,
                    });
                }
            }

            let ctx = TransitionContext {
                bypass: request.bypass,
                is_duplicate: p.graph.is_duplicate(id),
            };
            self.validator.check(item, target, ctx)?;

            let mut updated = item.clone();
            updated.state = target;
            updated.updated_at = Utc::now();
            match p.store.update(updated.clone()) {
                Ok(()) => {}
                Err(StoreError::NotFound(missing) | StoreError::DuplicateId(missing)) => {
                    return Err(EngineError::ItemNotFound(missing));
                }
            }

            let entry = HistoryEntry::new(from, target, request.actor.clone(), request.comment.clone());
            let at = entry.at;
            p.history.entry(id.to_string()).or_default().push(entry);

            debug!(%from, %target, "transition committed");
            Ok((
                updated,
                EngineEvent::TransitionOccurred {
                    project: project.to_string(),
                    item: id.to_string(),
                    from,
                    to: target,
                    actor: request.actor.clone(),
                    at,
                },
            ))
        })??;

        self.publish(&event);
        Ok(item)
    }

    /// Merge metadata entries into an item, re-validating the bounds.
    ///
    /// # Errors
    ///
    /// [`EngineError::Metadata`] when the merged map exceeds the bounds.
    pub fn update_metadata(
        &self,
        project: &str,
        id: &str,
        entries: BTreeMap<String, String>,
    ) -> Result<WorkItem, EngineError> {
        self.mutate_item(project, id, move |item| {
            item.metadata.extend(entries);
            validate_metadata(&item.metadata)?;
            Ok(())
        })
    }

    /// Set or clear the assignee.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`] or [`EngineError::ItemNotFound`].
    pub fn assign(
        &self,
        project: &str,
        id: &str,
        assignee: Option<String>,
    ) -> Result<WorkItem, EngineError> {
        self.mutate_item(project, id, move |item| {
            item.assignee = assignee;
            Ok(())
        })
    }

    /// Set or clear the duration estimate.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`] or [`EngineError::ItemNotFound`].
    pub fn set_estimate(
        &self,
        project: &str,
        id: &str,
        estimate: Option<u32>,
    ) -> Result<WorkItem, EngineError> {
        self.mutate_item(project, id, move |item| {
            item.estimate = estimate;
            Ok(())
        })
    }

    /// Attach the blocked annotation. Orthogonal to workflow state.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`] or [`EngineError::ItemNotFound`].
    pub fn set_blocked(
        &self,
        project: &str,
        id: &str,
        reason: impl Into<String>,
    ) -> Result<WorkItem, EngineError> {
        let reason = reason.into();
        self.mutate_item(project, id, move |item| {
            item.blocked = Some(BlockedFlag {
                reason,
                since: Utc::now(),
            });
            Ok(())
        })
    }

    /// Clear the blocked annotation.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`] or [`EngineError::ItemNotFound`].
    pub fn clear_blocked(&self, project: &str, id: &str) -> Result<WorkItem, EngineError> {
        self.mutate_item(project, id, |item| {
            item.blocked = None;
            Ok(())
        })
    }

    /// Remove an item. Items referenced by edges are never silently
    /// dropped: [`RemovalPolicy::Refuse`] rejects, [`RemovalPolicy::Detach`]
    /// removes the incident edges first.
    ///
    /// # Errors
    ///
    /// [`EngineError::EdgesAttached`] under the refuse policy.
    pub fn remove_item(
        &self,
        project: &str,
        id: &str,
        policy: RemovalPolicy,
    ) -> Result<WorkItem, EngineError> {
        self.with_project(project, |p| {
            if !p.store.contains(id) {
                return Err(EngineError::ItemNotFound(id.to_string()));
            }
            if p.graph.has_edges(id) {
                match policy {
                    RemovalPolicy::Refuse => {
                        let count = p
                            .graph
                            .dependencies()
                            .filter(|e| e.source == id || e.target == id)
                            .count()
                            + p.graph
                                .relationships()
                                .filter(|e| e.source == id || e.target == id)
                                .count();
                        return Err(EngineError::EdgesAttached {
                            id: id.to_string(),
                            count,
                        });
                    }
                    RemovalPolicy::Detach => {
                        let removed = p.graph.detach(id);
                        debug!(id, removed, "detached edges before removal");
                    }
                }
            }
            match p.store.remove(id) {
                Ok(item) => Ok(item),
                Err(StoreError::NotFound(missing) | StoreError::DuplicateId(missing)) => {
                    Err(EngineError::ItemNotFound(missing))
                }
            }
        })?
    }

    // -- edges --------------------------------------------------------------

    /// Add a dependency edge between two items of the same project.
    ///
    /// Both endpoints must exist locally; an edge to an item of another
    /// project must go through [`Self::add_cross_team_dependency`].
    ///
    /// # Errors
    ///
    /// [`EngineError::Graph`] with the cycle path on rejection (also
    /// published as a `CycleRejected` event), or the not-found errors.
    #[instrument(skip(self, edge), fields(edge = %edge))]
    pub fn add_dependency(
        &self,
        project: &str,
        edge: DependencyEdge,
    ) -> Result<(), EngineError> {
        let result = self.with_project(project, |p| {
            for endpoint in [&edge.source, &edge.target] {
                if !p.store.contains(endpoint) {
                    return Err(EngineError::ItemNotFound(endpoint.clone()));
                }
            }
            p.graph.add_dependency(edge.clone()).map_err(EngineError::from)
        })?;

        // A missing endpoint that lives in another project is a
        // cross-project edge missing its flag, not a plain not-found.
        // The owner scan runs after the project lock is released.
        if let Err(EngineError::ItemNotFound(missing)) = &result {
            if let Some(owner) = self.find_owner(missing, project) {
                return Err(EngineError::CrossProject {
                    from_id: edge.source,
                    target: edge.target,
                    source_project: project.to_string(),
                    target_project: owner,
                });
            }
        }

        self.publish_cycle_rejection(project, &edge, &result);
        result
    }

    /// Find which project (other than `exclude`) owns an item id. Each
    /// candidate project is locked briefly in turn; no locks nest.
    fn find_owner(&self, id: &str, exclude: &str) -> Option<String> {
        self.projects
            .ids()
            .into_iter()
            .filter(|candidate| candidate != exclude)
            .find(|candidate| {
                self.projects
                    .with(candidate, |p| p.store.contains(id))
                    .unwrap_or(false)
            })
    }

    /// Remove a dependency edge.
    ///
    /// # Errors
    ///
    /// [`EngineError::Graph`] when the edge does not exist.
    pub fn remove_dependency(
        &self,
        project: &str,
        edge: &DependencyEdge,
    ) -> Result<(), EngineError> {
        self.with_project(project, |p| {
            p.graph.remove_dependency(edge).map_err(EngineError::from)
        })?
    }

    /// Add a relationship edge (both endpoints local).
    ///
    /// # Errors
    ///
    /// [`EngineError::Graph`] for forest violations; hierarchy cycles are
    /// also published as `CycleRejected`.
    pub fn add_relationship(
        &self,
        project: &str,
        edge: RelationshipEdge,
    ) -> Result<(), EngineError> {
        let result = self.with_project(project, |p| {
            for endpoint in [&edge.source, &edge.target] {
                if !p.store.contains(endpoint) {
                    return Err(EngineError::ItemNotFound(endpoint.clone()));
                }
            }
            p.graph.add_relationship(edge.clone()).map_err(EngineError::from)
        })?;

        if let Err(EngineError::Graph(GraphError::CycleDetected { cycle })) = &result {
            self.publish(&EngineEvent::CycleRejected {
                project: project.to_string(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                cycle: cycle.clone(),
            });
        }
        result
    }

    /// Remove a relationship edge.
    ///
    /// # Errors
    ///
    /// [`EngineError::Graph`] when the edge does not exist.
    pub fn remove_relationship(
        &self,
        project: &str,
        edge: &RelationshipEdge,
    ) -> Result<(), EngineError> {
        self.with_project(project, |p| {
            p.graph.remove_relationship(edge).map_err(EngineError::from)
        })?
    }

    /// Add a dependency edge whose endpoints live in two different
    /// projects. Both project locks are taken in lexicographic id order;
    /// the edge is recorded in both graphs so each side gates and
    /// cycle-checks locally.
    ///
    /// # Errors
    ///
    /// The not-found errors, or [`EngineError::Graph`] if either side's
    /// graph would become cyclic (nothing is committed in that case).
    #[instrument(skip(self, edge), fields(edge = %edge))]
    pub fn add_cross_team_dependency(
        &self,
        source_project: &str,
        target_project: &str,
        edge: DependencyEdge,
    ) -> Result<(), EngineError> {
        if source_project == target_project {
            return self.add_dependency(source_project, edge);
        }
        for project in [source_project, target_project] {
            if !self.projects.contains(project) {
                return Err(EngineError::ProjectNotFound(project.to_string()));
            }
        }

        let result = self
            .projects
            .with_pair(source_project, target_project, |src, tgt| {
                if !src.store.contains(&edge.source) {
                    return Err(EngineError::ItemNotFound(edge.source.clone()));
                }
                if !tgt.store.contains(&edge.target) {
                    return Err(EngineError::ItemNotFound(edge.target.clone()));
                }

                src.graph.add_dependency(edge.clone())?;
                if let Err(err) = tgt.graph.add_dependency(edge.clone()) {
                    // Roll the source side back so neither graph commits.
                    let _ = src.graph.remove_dependency(&edge);
                    return Err(err.into());
                }
                Ok(())
            })
            .ok_or_else(|| EngineError::ProjectNotFound(source_project.to_string()))?;

        self.publish_cycle_rejection(source_project, &edge, &result);
        result
    }

    /// Remove a cross-team dependency edge from both projects.
    ///
    /// # Errors
    ///
    /// [`EngineError::Graph`] when the edge is missing on either side.
    pub fn remove_cross_team_dependency(
        &self,
        source_project: &str,
        target_project: &str,
        edge: &DependencyEdge,
    ) -> Result<(), EngineError> {
        if source_project == target_project {
            return self.remove_dependency(source_project, edge);
        }
        self.projects
            .with_pair(source_project, target_project, |src, tgt| {
                src.graph.remove_dependency(edge)?;
                tgt.graph.remove_dependency(edge)?;
                Ok(())
            })
            .ok_or_else(|| EngineError::ProjectNotFound(source_project.to_string()))?
    }

    // -- reports ------------------------------------------------------------

    /// Compute the critical path for a project.
    ///
    /// Emits `CriticalPathChanged` when the computed path differs from the
    /// previously reported one.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`]; [`EngineError::Schedule`] only if
    /// the stored edge set was corrupted externally.
    #[instrument(skip(self))]
    pub fn critical_path(&self, project: &str) -> Result<CriticalPathResult, EngineError> {
        let sg = self.schedule_graph(project)?;
        let result = compute_critical_path(&sg);

        let changed = self
            .with_project(project, |p| {
                if p.last_critical_path.as_ref() == Some(&result.critical_path) {
                    false
                } else {
                    p.last_critical_path = Some(result.critical_path.clone());
                    true
                }
            })
            .unwrap_or(false);

        if changed {
            self.publish(&EngineEvent::CriticalPathChanged {
                project: project.to_string(),
                new_path: result.critical_path.clone(),
            });
        }

        Ok(result)
    }

    /// Simulate delaying one item and report the propagated effect.
    ///
    /// # Errors
    ///
    /// [`EngineError::ItemNotFound`] for unknown items.
    pub fn delay_impact(
        &self,
        project: &str,
        id: &str,
        delay: u64,
    ) -> Result<ImpactResult, EngineError> {
        let sg = self.schedule_graph(project)?;
        match impact(&sg, id, delay) {
            Ok(result) => Ok(result),
            Err(ScheduleError::UnknownItem(item)) => Err(EngineError::ItemNotFound(item)),
            Err(err) => Err(err.into()),
        }
    }

    /// Level sets of items with no mutual ordering constraint.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`].
    pub fn parallelizable_sets(&self, project: &str) -> Result<Vec<Vec<String>>, EngineError> {
        let sg = self.schedule_graph(project)?;
        Ok(parallel_sets(&sg))
    }

    /// Transitive prerequisites of an item over the given dependency kinds.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`].
    pub fn ancestors(
        &self,
        project: &str,
        id: &str,
        kinds: &[DependencyKind],
    ) -> Result<BTreeSet<String>, EngineError> {
        self.with_project(project, |p| p.graph.ancestors(id, kinds))
    }

    /// Transitive dependents of an item over the given dependency kinds.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`].
    pub fn descendants(
        &self,
        project: &str,
        id: &str,
        kinds: &[DependencyKind],
    ) -> Result<BTreeSet<String>, EngineError> {
        self.with_project(project, |p| p.graph.descendants(id, kinds))
    }

    // -- snapshots ----------------------------------------------------------

    /// Capture a serializable snapshot of the project.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProjectNotFound`].
    pub fn snapshot(&self, project: &str) -> Result<ProjectSnapshot, EngineError> {
        self.with_project(project, |p| {
            ProjectSnapshot::capture(project, &p.store.all(), &p.graph)
        })
    }

    // -- internals ----------------------------------------------------------

    fn with_project<R>(
        &self,
        project: &str,
        f: impl FnOnce(&mut Project<S>) -> R,
    ) -> Result<R, EngineError> {
        self.projects
            .with(project, f)
            .ok_or_else(|| EngineError::ProjectNotFound(project.to_string()))
    }

    fn mutate_item(
        &self,
        project: &str,
        id: &str,
        f: impl FnOnce(&mut WorkItem) -> Result<(), EngineError>,
    ) -> Result<WorkItem, EngineError> {
        self.with_project(project, |p| {
            let mut item = p
                .store
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
            f(&mut item)?;
            item.updated_at = Utc::now();
            match p.store.update(item.clone()) {
                Ok(()) => Ok(item),
                Err(StoreError::NotFound(missing) | StoreError::DuplicateId(missing)) => {
                    Err(EngineError::ItemNotFound(missing))
                }
            }
        })?
    }

    /// Snapshot the project's nodes and edges under the lock, then build
    /// the schedule graph outside it.
    fn schedule_graph(&self, project: &str) -> Result<ScheduleGraph, EngineError> {
        let (nodes, edges) = self.with_project(project, |p| {
            let nodes: Vec<(String, Option<u32>)> = p
                .store
                .all()
                .iter()
                .map(|item| (item.id.clone(), item.estimate))
                .collect();
            let edges: Vec<DependencyEdge> = p.graph.dependencies().cloned().collect();
            (nodes, edges)
        })?;

        Ok(ScheduleGraph::build(
            nodes,
            &edges,
            self.config.default_duration,
        )?)
    }

    fn publish(&self, event: &EngineEvent) {
        for sink in &self.sinks {
            sink.publish(event);
        }
    }

    fn publish_cycle_rejection(
        &self,
        project: &str,
        edge: &DependencyEdge,
        result: &Result<(), EngineError>,
    ) {
        if let Err(EngineError::Graph(GraphError::CycleDetected { cycle })) = result {
            self.publish(&EngineEvent::CycleRejected {
                project: project.to_string(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                cycle: cycle.clone(),
            });
        }
    }
}

impl WorkflowEngine<InMemoryStore> {
    /// Restore a project from a snapshot, replacing any existing state for
    /// that project id.
    ///
    /// Restore verifies the structural invariants; a cycle or broken forest
    /// in the stored edge set aborts initialization of the project.
    ///
    /// # Errors
    ///
    /// [`EngineError::Snapshot`] describing the corruption.
    pub fn restore(&self, snapshot: ProjectSnapshot) -> Result<(), EngineError> {
        let project = snapshot.project.clone();
        let (store, graph) = snapshot.restore()?;
        self.projects.put(
            &project,
            Project {
                store,
                graph,
                history: HashMap::new(),
                last_critical_path: None,
            },
        );
        Ok(())
    }
}

/// Unmet done-prerequisites for an item: blocking dependency sources plus
/// non-done children. An id missing from the local store (a cross-team
/// blocker) counts as blocking until the edge is removed.
fn unmet_blockers<S: ItemStore>(p: &Project<S>, id: &str) -> Vec<String> {
    let mut blocking: Vec<String> = p
        .graph
        .done_prerequisites(id)
        .into_iter()
        .filter(|dep| p.store.get(dep).is_none_or(|item| !item.state.is_done()))
        .map(str::to_string)
        .collect();

    blocking.extend(
        p.graph
            .children(id)
            .into_iter()
            .filter(|child| p.store.get(child).is_none_or(|item| !item.state.is_done()))
            .map(str::to_string),
    );

    blocking.sort_unstable();
    blocking.dedup();
    blocking
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
