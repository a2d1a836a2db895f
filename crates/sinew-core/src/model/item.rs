//! Work item model: kinds, priorities, workflow states, and the item record.
//!
//! The workflow state machine is fixed: `found -> triaged -> to_do ->
//! in_progress -> in_test -> done -> released`, with `to_do -> done` as an
//! administrative fast-close and `in_test -> in_progress` as the only
//! backward transition. Everything else goes through the emergency bypass
//! evaluated by the validator, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

/// Maximum number of metadata entries per item.
pub const MAX_METADATA_ENTRIES: usize = 64;
/// Maximum metadata key length in bytes.
pub const MAX_METADATA_KEY_BYTES: usize = 128;
/// Maximum metadata value length in bytes.
pub const MAX_METADATA_VALUE_BYTES: usize = 4096;

/// The kinds of work item.
///
/// The built-in set is closed; deployments may extend it through
/// `EngineConfig::extra_kinds`, in which case the extra names parse as
/// [`ItemKind::Custom`] and are validated at item creation.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    Feature,
    Bug,
    Chore,
    #[default]
    Task,
    Epic,
    Story,
    Custom(String),
}

impl ItemKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Feature => "feature",
            Self::Bug => "bug",
            Self::Chore => "chore",
            Self::Task => "task",
            Self::Epic => "epic",
            Self::Story => "story",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Returns `true` for the built-in kinds that need no config entry.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<String> for ItemKind {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "feature" => Self::Feature,
            "bug" => Self::Bug,
            "chore" => Self::Chore,
            "task" => Self::Task,
            "epic" => Self::Epic,
            "story" => Self::Story,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ItemKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered priority scale. Derived `Ord` follows declaration order, so
/// `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// The seven lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Found,
    Triaged,
    ToDo,
    InProgress,
    InTest,
    Done,
    Released,
}

impl WorkflowState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::Triaged => "triaged",
            Self::ToDo => "to_do",
            Self::InProgress => "in_progress",
            Self::InTest => "in_test",
            Self::Done => "done",
            Self::Released => "released",
        }
    }

    /// Targets reachable from this state in the static transition graph.
    ///
    /// `in_test -> in_progress` is the sole backward transition; everything
    /// else moves forward. `released` is terminal.
    #[must_use]
    pub const fn forward_targets(self) -> &'static [Self] {
        match self {
            Self::Found => &[Self::Triaged],
            Self::Triaged => &[Self::ToDo],
            Self::ToDo => &[Self::InProgress, Self::Done],
            Self::InProgress => &[Self::InTest],
            Self::InTest => &[Self::Done, Self::InProgress],
            Self::Done => &[Self::Released],
            Self::Released => &[],
        }
    }

    /// Validate whether a transition from self to `target` is allowed by the
    /// static graph alone. The validator layers bypass and custom rules on
    /// top of this.
    pub fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        if self == target {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "no-op transition is not allowed",
            });
        }

        if self.forward_targets().contains(&target) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
                reason: "transition not allowed by lifecycle rules",
            })
        }
    }

    /// Returns `true` once the item counts as completed for dependency
    /// gating (`done` and `released`).
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done | Self::Released)
    }
}

/// Error returned when a state transition is rejected by the static graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} -> {to}: {reason}")]
pub struct InvalidTransition {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub reason: &'static str,
}

/// Orthogonal blocked annotation. Not a workflow state: an item can carry
/// this flag in any state without affecting the transition graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedFlag {
    pub reason: String,
    pub since: DateTime<Utc>,
}

/// A work item record. Owned by the store; mutated only through
/// engine-mediated operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: ItemKind,
    pub priority: Priority,
    pub state: WorkflowState,
    #[serde(default)]
    pub assignee: Option<String>,
    /// Duration estimate in abstract units; `None` falls back to the
    /// configured default during scheduling analysis.
    #[serde(default)]
    pub estimate: Option<u32>,
    #[serde(default)]
    pub blocked: Option<BlockedFlag>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a work item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewWorkItem {
    /// Caller-supplied id; the engine generates one when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub priority: Priority,
    /// Initial state; defaults to `found`. Creation is not a transition, so
    /// any state may be seeded here.
    #[serde(default)]
    pub state: Option<WorkflowState>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub estimate: Option<u32>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Error returned when metadata exceeds the documented bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("too many metadata entries: {count} (max {MAX_METADATA_ENTRIES})")]
    TooManyEntries { count: usize },
    #[error("metadata key too long: '{key}' ({len} bytes, max {MAX_METADATA_KEY_BYTES})")]
    KeyTooLong { key: String, len: usize },
    #[error("metadata value too long for key '{key}' ({len} bytes, max {MAX_METADATA_VALUE_BYTES})")]
    ValueTooLong { key: String, len: usize },
}

/// Check a metadata map against the size bounds.
///
/// # Errors
///
/// Returns the first violated bound in key order.
pub fn validate_metadata(metadata: &BTreeMap<String, String>) -> Result<(), MetadataError> {
    if metadata.len() > MAX_METADATA_ENTRIES {
        return Err(MetadataError::TooManyEntries {
            count: metadata.len(),
        });
    }
    for (key, value) in metadata {
        if key.len() > MAX_METADATA_KEY_BYTES {
            return Err(MetadataError::KeyTooLong {
                key: key.clone(),
                len: key.len(),
            });
        }
        if value.len() > MAX_METADATA_VALUE_BYTES {
            return Err(MetadataError::ValueTooLong {
                key: key.clone(),
                len: value.len(),
            });
        }
    }
    Ok(())
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for WorkflowState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "found" => Ok(Self::Found),
            "triaged" => Ok(Self::Triaged),
            "to_do" | "todo" => Ok(Self::ToDo),
            "in_progress" => Ok(Self::InProgress),
            "in_test" => Ok(Self::InTest),
            "done" => Ok(Self::Done),
            "released" => Ok(Self::Released),
            _ => Err(ParseEnumError {
                expected: "state",
                got: s.to_string(),
            }),
        }
    }
}
