//! Reconciliation of partial engine responses into a full configuration.
//!
//! The engine reports only the attributes an operation touched. [`merge`]
//! folds such a partial response into the prior configuration: touched
//! attributes are updated field by field, everything else is carried forward
//! unchanged.

use std::collections::BTreeMap;

use tracing::warn;

use configurator_core::delta::{
    BooleanConsequence, BooleanDecisionDelta, ChoiceConsequence, ChoiceValueDecisionDelta,
    ComponentConsequence, ComponentDecisionDelta, NumericConsequence, NumericDecisionDelta,
};
use configurator_core::{
    Attribute, AttributeId, BooleanAttribute, ChoiceAttribute, ChoiceValue, ComponentAttribute,
    Configuration, ConsequencesDelta, DecisionsDelta, NumericAttribute,
};

/// Fold a partial response into `prior`, producing the next configuration.
///
/// Merging empty deltas yields a configuration equal to `prior`.
pub fn merge(
    prior: &Configuration,
    consequences: &ConsequencesDelta,
    decisions: &DecisionsDelta,
) -> Configuration {
    let mut attributes = prior.attributes.clone();

    merge_kind::<BooleanAttribute>(&mut attributes, &consequences.boolean, &decisions.boolean);
    merge_kind::<NumericAttribute>(&mut attributes, &consequences.numeric, &decisions.numeric);
    merge_kind::<ChoiceAttribute>(&mut attributes, &consequences.choice, &decisions.choice_value);
    merge_kind::<ComponentAttribute>(
        &mut attributes,
        &consequences.component,
        &decisions.component,
    );

    Configuration {
        is_satisfied: consequences
            .is_configuration_satisfied
            .unwrap_or(prior.is_satisfied),
        attributes,
    }
}

/// One attribute variant together with the deltas that update it.
trait MergeTarget: Clone {
    type Consequence;
    type DecisionDelta;

    const KIND: &'static str;

    fn consequence_id(consequence: &Self::Consequence) -> &AttributeId;
    fn decision_id(delta: &Self::DecisionDelta) -> &AttributeId;

    fn from_attribute(attribute: &Attribute) -> Option<&Self>;
    fn into_attribute(self) -> Attribute;

    /// Materialise an attribute the prior configuration does not know.
    fn from_consequence(id: &AttributeId, consequence: &Self::Consequence) -> Self;

    fn apply_consequence(&mut self, consequence: &Self::Consequence);
    fn apply_decision(&mut self, delta: &Self::DecisionDelta);
}

fn merge_kind<A: MergeTarget>(
    attributes: &mut BTreeMap<AttributeId, Attribute>,
    consequences: &[A::Consequence],
    decisions: &[A::DecisionDelta],
) {
    let mut touched: BTreeMap<&AttributeId, (Option<&A::Consequence>, Vec<&A::DecisionDelta>)> =
        BTreeMap::new();
    for consequence in consequences {
        touched.entry(A::consequence_id(consequence)).or_default().0 = Some(consequence);
    }
    for delta in decisions {
        touched.entry(A::decision_id(delta)).or_default().1.push(delta);
    }

    for (id, (consequence, deltas)) in touched {
        let mut next = match (attributes.get(id), consequence) {
            (Some(existing), _) => match A::from_attribute(existing) {
                Some(prior) => {
                    let mut next = prior.clone();
                    if let Some(consequence) = consequence {
                        next.apply_consequence(consequence);
                    }
                    next
                }
                None => {
                    warn!(
                        attribute = %id,
                        expected = A::KIND,
                        found = existing.kind_name(),
                        "Skipping delta for attribute of a different kind"
                    );
                    continue;
                }
            },
            (None, Some(consequence)) => A::from_consequence(id, consequence),
            (None, None) => {
                warn!(attribute = %id, kind = A::KIND, "Skipping decision for unknown attribute");
                continue;
            }
        };

        for delta in deltas {
            next.apply_decision(delta);
        }
        attributes.insert(id.clone(), next.into_attribute());
    }
}

impl MergeTarget for BooleanAttribute {
    type Consequence = BooleanConsequence;
    type DecisionDelta = BooleanDecisionDelta;

    const KIND: &'static str = "boolean";

    fn consequence_id(consequence: &Self::Consequence) -> &AttributeId {
        &consequence.attribute_id
    }

    fn decision_id(delta: &Self::DecisionDelta) -> &AttributeId {
        &delta.attribute_id
    }

    fn from_attribute(attribute: &Attribute) -> Option<&Self> {
        match attribute {
            Attribute::Boolean(a) => Some(a),
            _ => None,
        }
    }

    fn into_attribute(self) -> Attribute {
        Attribute::Boolean(self)
    }

    fn from_consequence(id: &AttributeId, consequence: &Self::Consequence) -> Self {
        Self {
            id: id.clone(),
            is_satisfied: consequence.is_satisfied,
            can_contribute_to_configuration_satisfaction: consequence
                .can_contribute_to_configuration_satisfaction,
            possible_decision_states: consequence.possible_decision_states.clone(),
            decision: None,
        }
    }

    fn apply_consequence(&mut self, consequence: &Self::Consequence) {
        self.is_satisfied = consequence.is_satisfied;
        self.can_contribute_to_configuration_satisfaction =
            consequence.can_contribute_to_configuration_satisfaction;
        self.possible_decision_states = consequence.possible_decision_states.clone();
    }

    fn apply_decision(&mut self, delta: &Self::DecisionDelta) {
        self.decision = delta.decision;
    }
}

impl MergeTarget for NumericAttribute {
    type Consequence = NumericConsequence;
    type DecisionDelta = NumericDecisionDelta;

    const KIND: &'static str = "numeric";

    fn consequence_id(consequence: &Self::Consequence) -> &AttributeId {
        &consequence.attribute_id
    }

    fn decision_id(delta: &Self::DecisionDelta) -> &AttributeId {
        &delta.attribute_id
    }

    fn from_attribute(attribute: &Attribute) -> Option<&Self> {
        match attribute {
            Attribute::Numeric(a) => Some(a),
            _ => None,
        }
    }

    fn into_attribute(self) -> Attribute {
        Attribute::Numeric(self)
    }

    fn from_consequence(id: &AttributeId, consequence: &Self::Consequence) -> Self {
        Self {
            id: id.clone(),
            is_satisfied: consequence.is_satisfied,
            can_contribute_to_configuration_satisfaction: consequence
                .can_contribute_to_configuration_satisfaction,
            range: consequence.range,
            decimal_places: consequence.decimal_places,
            decision: None,
        }
    }

    fn apply_consequence(&mut self, consequence: &Self::Consequence) {
        self.is_satisfied = consequence.is_satisfied;
        self.can_contribute_to_configuration_satisfaction =
            consequence.can_contribute_to_configuration_satisfaction;
        self.range = consequence.range;
        self.decimal_places = consequence.decimal_places;
    }

    fn apply_decision(&mut self, delta: &Self::DecisionDelta) {
        self.decision = delta.decision;
    }
}

/// Choice attributes merge per value: value-level consequences and decisions
/// update only the values they name.
impl MergeTarget for ChoiceAttribute {
    type Consequence = ChoiceConsequence;
    type DecisionDelta = ChoiceValueDecisionDelta;

    const KIND: &'static str = "choice";

    fn consequence_id(consequence: &Self::Consequence) -> &AttributeId {
        &consequence.attribute_id
    }

    fn decision_id(delta: &Self::DecisionDelta) -> &AttributeId {
        &delta.attribute_id
    }

    fn from_attribute(attribute: &Attribute) -> Option<&Self> {
        match attribute {
            Attribute::Choice(a) => Some(a),
            _ => None,
        }
    }

    fn into_attribute(self) -> Attribute {
        Attribute::Choice(self)
    }

    fn from_consequence(id: &AttributeId, consequence: &Self::Consequence) -> Self {
        let mut attribute = Self {
            id: id.clone(),
            is_satisfied: consequence.is_satisfied,
            can_contribute_to_configuration_satisfaction: consequence
                .can_contribute_to_configuration_satisfaction,
            cardinality: consequence.cardinality,
            values: BTreeMap::new(),
        };
        attribute.apply_consequence(consequence);
        attribute
    }

    fn apply_consequence(&mut self, consequence: &Self::Consequence) {
        self.is_satisfied = consequence.is_satisfied;
        self.can_contribute_to_configuration_satisfaction =
            consequence.can_contribute_to_configuration_satisfaction;
        self.cardinality = consequence.cardinality;

        for value in &consequence.values {
            self.values
                .entry(value.choice_value_id.clone())
                .and_modify(|existing| {
                    existing.possible_decision_states = value.possible_decision_states.clone();
                })
                .or_insert_with(|| ChoiceValue {
                    id: value.choice_value_id.clone(),
                    possible_decision_states: value.possible_decision_states.clone(),
                    decision: None,
                });
        }
    }

    fn apply_decision(&mut self, delta: &Self::DecisionDelta) {
        match self.values.get_mut(&delta.choice_value_id) {
            Some(value) => value.decision = delta.decision,
            None => warn!(
                attribute = %self.id,
                choice_value = %delta.choice_value_id,
                "Skipping decision for unknown choice value"
            ),
        }
    }
}

impl MergeTarget for ComponentAttribute {
    type Consequence = ComponentConsequence;
    type DecisionDelta = ComponentDecisionDelta;

    const KIND: &'static str = "component";

    fn consequence_id(consequence: &Self::Consequence) -> &AttributeId {
        &consequence.attribute_id
    }

    fn decision_id(delta: &Self::DecisionDelta) -> &AttributeId {
        &delta.attribute_id
    }

    fn from_attribute(attribute: &Attribute) -> Option<&Self> {
        match attribute {
            Attribute::Component(a) => Some(a),
            _ => None,
        }
    }

    fn into_attribute(self) -> Attribute {
        Attribute::Component(self)
    }

    fn from_consequence(id: &AttributeId, consequence: &Self::Consequence) -> Self {
        Self {
            id: id.clone(),
            is_satisfied: consequence.is_satisfied,
            can_contribute_to_configuration_satisfaction: consequence
                .can_contribute_to_configuration_satisfaction,
            possible_decision_states: consequence.possible_decision_states.clone(),
            decision: None,
        }
    }

    fn apply_consequence(&mut self, consequence: &Self::Consequence) {
        self.is_satisfied = consequence.is_satisfied;
        self.can_contribute_to_configuration_satisfaction =
            consequence.can_contribute_to_configuration_satisfaction;
        self.possible_decision_states = consequence.possible_decision_states.clone();
    }

    fn apply_decision(&mut self, delta: &Self::DecisionDelta) {
        self.decision = delta.decision;
    }
}
