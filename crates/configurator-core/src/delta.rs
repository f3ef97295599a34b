//! Partial state reported by the engine.
//!
//! The engine answers every operation with only the attributes whose
//! decisions or consequences changed. These types carry those deltas until
//! they are folded into a full [`Configuration`](crate::Configuration).

use serde::{Deserialize, Serialize};

use crate::attribute::{
    AttributeId, Cardinality, ChoiceValueDecisionState, ComponentDecisionState, Decision,
    NumericRange,
};
use crate::decision::AttributeDecision;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanDecisionDelta {
    pub attribute_id: AttributeId,
    pub decision: Option<Decision<bool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericDecisionDelta {
    pub attribute_id: AttributeId,
    pub decision: Option<Decision<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceValueDecisionDelta {
    pub attribute_id: AttributeId,
    pub choice_value_id: String,
    pub decision: Option<Decision<ChoiceValueDecisionState>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDecisionDelta {
    pub attribute_id: AttributeId,
    pub decision: Option<Decision<ComponentDecisionState>>,
}

/// Decisions affected by an operation, per attribute kind.
///
/// A present entry with `decision: None` means the decision was removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionsDelta {
    pub boolean: Vec<BooleanDecisionDelta>,
    pub numeric: Vec<NumericDecisionDelta>,
    pub choice_value: Vec<ChoiceValueDecisionDelta>,
    pub component: Vec<ComponentDecisionDelta>,
}

impl DecisionsDelta {
    pub fn is_empty(&self) -> bool {
        self.boolean.is_empty()
            && self.numeric.is_empty()
            && self.choice_value.is_empty()
            && self.component.is_empty()
    }

    pub fn len(&self) -> usize {
        self.boolean.len() + self.numeric.len() + self.choice_value.len() + self.component.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanConsequence {
    pub attribute_id: AttributeId,
    pub is_satisfied: bool,
    pub can_contribute_to_configuration_satisfaction: bool,
    pub possible_decision_states: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericConsequence {
    pub attribute_id: AttributeId,
    pub is_satisfied: bool,
    pub can_contribute_to_configuration_satisfaction: bool,
    pub range: NumericRange,
    pub decimal_places: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceValueConsequence {
    pub choice_value_id: String,
    pub possible_decision_states: Vec<ChoiceValueDecisionState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceConsequence {
    pub attribute_id: AttributeId,
    pub is_satisfied: bool,
    pub can_contribute_to_configuration_satisfaction: bool,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub values: Vec<ChoiceValueConsequence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConsequence {
    pub attribute_id: AttributeId,
    pub is_satisfied: bool,
    pub can_contribute_to_configuration_satisfaction: bool,
    pub possible_decision_states: Vec<ComponentDecisionState>,
}

/// Consequences of an operation, per attribute kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsequencesDelta {
    pub is_configuration_satisfied: Option<bool>,
    pub boolean: Vec<BooleanConsequence>,
    pub numeric: Vec<NumericConsequence>,
    pub choice: Vec<ChoiceConsequence>,
    pub component: Vec<ComponentConsequence>,
}

impl ConsequencesDelta {
    pub fn is_empty(&self) -> bool {
        self.is_configuration_satisfied.is_none()
            && self.boolean.is_empty()
            && self.numeric.is_empty()
            && self.choice.is_empty()
            && self.component.is_empty()
    }
}

/// Engine answer to a single decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionResponse {
    pub consequences: ConsequencesDelta,
    pub affected_decisions: DecisionsDelta,
}

/// Engine answer to a batch of decisions that was applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SetManyResponse {
    pub consequences: ConsequencesDelta,
    pub affected_decisions: DecisionsDelta,
    pub rejected_decisions: Vec<AttributeDecision>,
}
