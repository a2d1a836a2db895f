//! Transition legality checks.
//!
//! Pure function over its inputs: current state, requested state, the
//! request context, and the registered custom rules. Checks run in a fixed
//! order so failure reasons are deterministic:
//!
//! 1. duplicate closure restriction,
//! 2. static transition graph (with the in_test -> in_progress loop),
//! 3. emergency bypass, evaluated only when the static graph says no,
//! 4. custom rules, in registration order.

use serde::{Deserialize, Serialize};

use crate::model::item::{Priority, WorkItem, WorkflowState};
use crate::rules::TransitionRule;

/// Metadata key that must be present for an emergency bypass to be honored.
pub const BYPASS_APPROVAL_KEY: &str = "approved_by";

/// Per-request context the engine supplies alongside the item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionContext {
    /// Caller requested the emergency bypass (hotfix straight to
    /// in_progress). Honored only for critical items carrying an
    /// `approved_by` metadata marker.
    #[serde(default)]
    pub bypass: bool,
    /// The item carries a duplicate-of edge; its transitions reduce to
    /// closure.
    #[serde(default)]
    pub is_duplicate: bool,
}

/// Errors from transition validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("invalid transition {from} -> {to}: {reason}")]
    Invalid {
        from: WorkflowState,
        to: WorkflowState,
        reason: String,
    },
    #[error("validation rule '{rule}' failed: {reason}")]
    RuleFailed { rule: String, reason: String },
}

/// Stateless validator holding the registered custom rules.
#[derive(Debug, Clone, Default)]
pub struct TransitionValidator {
    rules: Vec<TransitionRule>,
}

impl TransitionValidator {
    #[must_use]
    pub fn new(rules: Vec<TransitionRule>) -> Self {
        Self { rules }
    }

    /// Registered rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[TransitionRule] {
        &self.rules
    }

    /// Decide whether `item` may move to `target`.
    ///
    /// No side effects; the engine commits separately on `Ok`.
    ///
    /// # Errors
    ///
    /// [`TransitionError::Invalid`] when the move is structurally
    /// disallowed, [`TransitionError::RuleFailed`] naming the first custom
    /// rule that rejected it.
    pub fn check(
        &self,
        item: &WorkItem,
        target: WorkflowState,
        ctx: TransitionContext,
    ) -> Result<(), TransitionError> {
        let from = item.state;

        if ctx.is_duplicate {
            // Duplicates may be closed but not independently worked or
            // shipped: the only legal target is done, from any other state.
            if target != WorkflowState::Done || from == target {
                return Err(TransitionError::Invalid {
                    from,
                    to: target,
                    reason: "duplicate items may only be closed as done".to_string(),
                });
            }
        } else if let Err(invalid) = from.can_transition_to(target) {
            if !bypass_applies(item, target, ctx) {
                return Err(TransitionError::Invalid {
                    from,
                    to: target,
                    reason: if ctx.bypass {
                        "bypass requires critical priority and an approved_by marker".to_string()
                    } else {
                        invalid.reason.to_string()
                    },
                });
            }
        }

        for rule in &self.rules {
            if rule.when.matches(item, from, target) {
                if let Err(reason) = rule.require.evaluate(item) {
                    return Err(TransitionError::RuleFailed {
                        rule: rule.name.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(())
    }

    /// States reachable from the item's current state through the static
    /// graph and the active rules (bypass targets excluded).
    #[must_use]
    pub fn available_transitions(&self, item: &WorkItem, is_duplicate: bool) -> Vec<WorkflowState> {
        let ctx = TransitionContext {
            bypass: false,
            is_duplicate,
        };
        let candidates = if is_duplicate {
            &[WorkflowState::Done][..]
        } else {
            item.state.forward_targets()
        };
        candidates
            .iter()
            .copied()
            .filter(|&target| self.check(item, target, ctx).is_ok())
            .collect()
    }
}

/// The emergency bypass: hotfix jumps straight to in_progress, but only
/// for critical items carrying an approval marker.
fn bypass_applies(item: &WorkItem, target: WorkflowState, ctx: TransitionContext) -> bool {
    ctx.bypass
        && target == WorkflowState::InProgress
        && item.priority == Priority::Critical
        && item.metadata.contains_key(BYPASS_APPROVAL_KEY)
}
