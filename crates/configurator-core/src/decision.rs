//! Explicit decisions and the modes they are applied with.

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeId, ChoiceValueDecisionState, ComponentDecisionState};

/// An explicit instruction to set or clear a value.
///
/// A `None` state clears the caller's decision on that attribute or value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum AttributeDecision {
    Boolean {
        attribute_id: AttributeId,
        state: Option<bool>,
    },
    Numeric {
        attribute_id: AttributeId,
        state: Option<f64>,
    },
    ChoiceValue {
        attribute_id: AttributeId,
        choice_value_id: String,
        state: Option<ChoiceValueDecisionState>,
    },
    Component {
        attribute_id: AttributeId,
        state: Option<ComponentDecisionState>,
    },
}

impl AttributeDecision {
    pub fn attribute_id(&self) -> &AttributeId {
        match self {
            AttributeDecision::Boolean { attribute_id, .. }
            | AttributeDecision::Numeric { attribute_id, .. }
            | AttributeDecision::ChoiceValue { attribute_id, .. }
            | AttributeDecision::Component { attribute_id, .. } => attribute_id,
        }
    }

    /// Whether this decision clears rather than sets a value.
    pub fn is_clear(&self) -> bool {
        match self {
            AttributeDecision::Boolean { state, .. } => state.is_none(),
            AttributeDecision::Numeric { state, .. } => state.is_none(),
            AttributeDecision::ChoiceValue { state, .. } => state.is_none(),
            AttributeDecision::Component { state, .. } => state.is_none(),
        }
    }
}

/// How a manual conflict is reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ConflictHandling {
    /// The engine resolves conflicts by dropping conflicting prior decisions.
    Automatic,
    /// The engine rejects the batch and answers with explanations.
    Manual {
        include_constraints_in_conflict_explanation: bool,
    },
}

/// How a batch of decisions is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum SetManyMode {
    DropExistingDecisions { conflict_handling: ConflictHandling },
    KeepExistingDecisions,
}

impl SetManyMode {
    /// Replace all explicit decisions, resolving conflicts automatically.
    pub const fn drop_existing_automatic() -> Self {
        SetManyMode::DropExistingDecisions {
            conflict_handling: ConflictHandling::Automatic,
        }
    }

    /// Two modes belong to the same family when they are the same variant.
    pub fn same_family(&self, other: &SetManyMode) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A candidate batch of decisions resolving a conflict or answering an
/// explain question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainSolution {
    pub decisions: Vec<AttributeDecision>,
    pub mode: SetManyMode,
}

impl PartialEq for ExplainSolution {
    /// Decisions compare as a set; modes compare by family.
    fn eq(&self, other: &Self) -> bool {
        self.mode.same_family(&other.mode)
            && self.decisions.len() == other.decisions.len()
            && self.decisions.iter().all(|d| other.decisions.contains(d))
            && other.decisions.iter().all(|d| self.decisions.contains(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boolean(id: &str, state: bool) -> AttributeDecision {
        AttributeDecision::Boolean {
            attribute_id: AttributeId::new(id),
            state: Some(state),
        }
    }

    #[test]
    fn test_solution_equality_ignores_order() {
        let a = ExplainSolution {
            decisions: vec![boolean("A", true), boolean("B", false)],
            mode: SetManyMode::KeepExistingDecisions,
        };
        let b = ExplainSolution {
            decisions: vec![boolean("B", false), boolean("A", true)],
            mode: SetManyMode::KeepExistingDecisions,
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_solution_equality_compares_values() {
        let a = ExplainSolution {
            decisions: vec![boolean("A", true)],
            mode: SetManyMode::KeepExistingDecisions,
        };
        let b = ExplainSolution {
            decisions: vec![boolean("A", false)],
            mode: SetManyMode::KeepExistingDecisions,
        };
        assert_ne!(a, b);
    }

    #[test]
    fn test_solution_equality_compares_mode_family() {
        let automatic = ExplainSolution {
            decisions: vec![boolean("A", true)],
            mode: SetManyMode::drop_existing_automatic(),
        };
        let manual = ExplainSolution {
            decisions: vec![boolean("A", true)],
            mode: SetManyMode::DropExistingDecisions {
                conflict_handling: ConflictHandling::Manual {
                    include_constraints_in_conflict_explanation: true,
                },
            },
        };
        let keep = ExplainSolution {
            decisions: vec![boolean("A", true)],
            mode: SetManyMode::KeepExistingDecisions,
        };
        assert_eq!(automatic, manual);
        assert_ne!(automatic, keep);
    }

    #[test]
    fn test_clear_decisions() {
        let blue = AttributeDecision::ChoiceValue {
            attribute_id: AttributeId::new("Color"),
            choice_value_id: "blue".into(),
            state: None,
        };
        assert!(blue.is_clear());
        assert!(!boolean("A", true).is_clear());
    }

    #[test]
    fn test_decision_serializes_tagged() {
        let json = serde_json::to_value(boolean("A", true)).unwrap();
        assert_eq!(json["type"], "Boolean");
        assert_eq!(json["attributeId"]["localId"], "A");
        assert_eq!(json["state"], true);
    }
}
