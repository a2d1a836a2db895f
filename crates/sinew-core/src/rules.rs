//! Custom transition validation rules, expressed as data.
//!
//! Rules arrive through configuration, not code: a rule is a name, a
//! condition selecting which transitions it applies to, and a check the
//! item must satisfy. Conditions and checks are small tagged expression
//! trees evaluated against a fixed attribute set (kind, priority, the
//! transition pair, metadata lookups). No scripting engine, so configs
//! stay host-language-neutral and serializable.
//!
//! Rules are evaluated in registration order; the first failing check wins
//! and its rule name is reported to the caller.

use serde::{Deserialize, Serialize};

use crate::model::item::{ItemKind, Priority, WorkItem, WorkflowState};

/// Selects the transitions a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCondition {
    /// Applies to every transition.
    Always,
    /// Applies to items of the given kind.
    Kind { kind: ItemKind },
    /// Applies to one exact transition pair.
    Transition {
        from: WorkflowState,
        to: WorkflowState,
    },
    /// Applies to any transition into the given state.
    TargetState { to: WorkflowState },
    /// All sub-conditions must match.
    All { conditions: Vec<RuleCondition> },
    /// At least one sub-condition must match.
    Any { conditions: Vec<RuleCondition> },
}

impl RuleCondition {
    /// Whether the rule applies to this item and transition pair.
    #[must_use]
    pub fn matches(&self, item: &WorkItem, from: WorkflowState, to: WorkflowState) -> bool {
        match self {
            Self::Always => true,
            Self::Kind { kind } => item.kind == *kind,
            Self::Transition {
                from: f,
                to: t,
            } => *f == from && *t == to,
            Self::TargetState { to: t } => *t == to,
            Self::All { conditions } => conditions.iter().all(|c| c.matches(item, from, to)),
            Self::Any { conditions } => conditions.iter().any(|c| c.matches(item, from, to)),
        }
    }
}

/// A predicate over the item that must hold for the transition to proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCheck {
    /// Item priority must be at least this.
    MinPriority { at_least: Priority },
    /// Metadata must contain the key.
    MetadataPresent { key: String },
    /// Metadata must map the key to exactly this value.
    MetadataEquals { key: String, value: String },
    /// Item must carry a duration estimate.
    HasEstimate,
    /// Item must be assigned to someone.
    HasAssignee,
    /// Negation.
    Not { check: Box<RuleCheck> },
    /// All sub-checks must pass.
    All { checks: Vec<RuleCheck> },
    /// At least one sub-check must pass.
    Any { checks: Vec<RuleCheck> },
}

impl RuleCheck {
    /// Evaluate against the item. `Err` carries a human-readable reason for
    /// the first failing leaf.
    ///
    /// # Errors
    ///
    /// Returns the failure reason when the predicate does not hold.
    pub fn evaluate(&self, item: &WorkItem) -> Result<(), String> {
        match self {
            Self::MinPriority { at_least } => {
                if item.priority >= *at_least {
                    Ok(())
                } else {
                    Err(format!(
                        "priority {} is below required {at_least}",
                        item.priority
                    ))
                }
            }
            Self::MetadataPresent { key } => {
                if item.metadata.contains_key(key) {
                    Ok(())
                } else {
                    Err(format!("metadata key '{key}' is missing"))
                }
            }
            Self::MetadataEquals { key, value } => match item.metadata.get(key) {
                Some(v) if v == value => Ok(()),
                Some(v) => Err(format!("metadata '{key}' is '{v}', expected '{value}'")),
                None => Err(format!("metadata key '{key}' is missing")),
            },
            Self::HasEstimate => {
                if item.estimate.is_some() {
                    Ok(())
                } else {
                    Err("item has no duration estimate".to_string())
                }
            }
            Self::HasAssignee => {
                if item.assignee.is_some() {
                    Ok(())
                } else {
                    Err("item is unassigned".to_string())
                }
            }
            Self::Not { check } => match check.evaluate(item) {
                Ok(()) => Err("negated check passed".to_string()),
                Err(_) => Ok(()),
            },
            Self::All { checks } => {
                for check in checks {
                    check.evaluate(item)?;
                }
                Ok(())
            }
            Self::Any { checks } => {
                let mut last = "empty any-check".to_string();
                for check in checks {
                    match check.evaluate(item) {
                        Ok(()) => return Ok(()),
                        Err(reason) => last = reason,
                    }
                }
                Err(last)
            }
        }
    }
}

/// A named rule: condition scoping plus the required check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub name: String,
    pub when: RuleCondition,
    pub require: RuleCheck,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn item(kind: ItemKind, priority: Priority) -> WorkItem {
        let now = Utc::now();
        WorkItem {
            id: "w-1".to_string(),
            title: "test".to_string(),
            description: None,
            kind,
            priority,
            state: WorkflowState::ToDo,
            assignee: None,
            estimate: None,
            blocked: None,
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn condition_matching() {
        let it = item(ItemKind::Bug, Priority::High);

        assert!(RuleCondition::Always.matches(&it, WorkflowState::ToDo, WorkflowState::Done));
        assert!(
            RuleCondition::Kind {
                kind: ItemKind::Bug
            }
            .matches(&it, WorkflowState::ToDo, WorkflowState::Done)
        );
        assert!(
            !RuleCondition::Kind {
                kind: ItemKind::Epic
            }
            .matches(&it, WorkflowState::ToDo, WorkflowState::Done)
        );
        assert!(
            RuleCondition::Transition {
                from: WorkflowState::ToDo,
                to: WorkflowState::Done,
            }
            .matches(&it, WorkflowState::ToDo, WorkflowState::Done)
        );
        assert!(
            RuleCondition::TargetState {
                to: WorkflowState::Done
            }
            .matches(&it, WorkflowState::InTest, WorkflowState::Done)
        );
    }

    #[test]
    fn combinator_conditions() {
        let it = item(ItemKind::Bug, Priority::High);
        let all = RuleCondition::All {
            conditions: vec![
                RuleCondition::Kind {
                    kind: ItemKind::Bug,
                },
                RuleCondition::TargetState {
                    to: WorkflowState::Done,
                },
            ],
        };
        assert!(all.matches(&it, WorkflowState::InTest, WorkflowState::Done));
        assert!(!all.matches(&it, WorkflowState::ToDo, WorkflowState::InProgress));

        let any = RuleCondition::Any {
            conditions: vec![
                RuleCondition::Kind {
                    kind: ItemKind::Epic,
                },
                RuleCondition::TargetState {
                    to: WorkflowState::Done,
                },
            ],
        };
        assert!(any.matches(&it, WorkflowState::InTest, WorkflowState::Done));
    }

    #[test]
    fn checks_evaluate_with_reasons() {
        let mut it = item(ItemKind::Task, Priority::Low);
        it.metadata
            .insert("reviewed".to_string(), "yes".to_string());

        assert!(
            RuleCheck::MinPriority {
                at_least: Priority::Medium
            }
            .evaluate(&it)
            .unwrap_err()
            .contains("below required")
        );

        assert!(
            RuleCheck::MetadataPresent {
                key: "reviewed".to_string()
            }
            .evaluate(&it)
            .is_ok()
        );
        assert!(
            RuleCheck::MetadataEquals {
                key: "reviewed".to_string(),
                value: "yes".to_string(),
            }
            .evaluate(&it)
            .is_ok()
        );
        assert!(
            RuleCheck::MetadataEquals {
                key: "reviewed".to_string(),
                value: "no".to_string(),
            }
            .evaluate(&it)
            .is_err()
        );

        assert!(RuleCheck::HasEstimate.evaluate(&it).is_err());
        it.estimate = Some(3);
        assert!(RuleCheck::HasEstimate.evaluate(&it).is_ok());
    }

    #[test]
    fn not_and_nested_combinators() {
        let it = item(ItemKind::Task, Priority::Critical);

        let check = RuleCheck::Not {
            check: Box::new(RuleCheck::HasAssignee),
        };
        assert!(check.evaluate(&it).is_ok(), "unassigned passes the negation");

        let all = RuleCheck::All {
            checks: vec![
                RuleCheck::MinPriority {
                    at_least: Priority::High,
                },
                RuleCheck::HasEstimate,
            ],
        };
        assert!(all.evaluate(&it).is_err(), "estimate missing fails the all");

        let any = RuleCheck::Any {
            checks: vec![
                RuleCheck::HasEstimate,
                RuleCheck::MinPriority {
                    at_least: Priority::High,
                },
            ],
        };
        assert!(any.evaluate(&it).is_ok());
    }

    #[test]
    fn rules_deserialize_from_config_data() {
        let json = r#"{
            "name": "bugs-need-review-before-done",
            "when": {
                "type": "all",
                "conditions": [
                    { "type": "kind", "kind": "bug" },
                    { "type": "target_state", "to": "done" }
                ]
            },
            "require": { "type": "metadata_present", "key": "review" }
        }"#;

        let rule: TransitionRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.name, "bugs-need-review-before-done");

        let mut it = item(ItemKind::Bug, Priority::Medium);
        assert!(rule.when.matches(&it, WorkflowState::InTest, WorkflowState::Done));
        assert!(rule.require.evaluate(&it).is_err());

        it.metadata.insert("review".to_string(), "r-42".to_string());
        assert!(rule.require.evaluate(&it).is_ok());
    }
}
