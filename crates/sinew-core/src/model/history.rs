//! Immutable transition history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::WorkflowState;

/// One committed state change. Entries are append-only; the engine never
/// rewrites or removes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub actor: String,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl HistoryEntry {
    #[must_use]
    pub fn new(
        from: WorkflowState,
        to: WorkflowState,
        actor: impl Into<String>,
        comment: Option<String>,
    ) -> Self {
        Self {
            from,
            to,
            actor: actor.into(),
            at: Utc::now(),
            comment,
        }
    }
}
