//! Attribute model: the decision points of a configuration model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between component path segments and the local id.
const PATH_SEPARATOR: &str = "::";

/// Separator between the shared model id and the attribute path.
const SHARED_MODEL_SEPARATOR: char = '/';

/// Path-shaped identifier of an attribute.
///
/// Unique across nested components and shared configuration models.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeId {
    /// Id of the attribute within its owning model
    pub local_id: String,
    /// Path of component attributes leading to the owning model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_path: Vec<String>,
    /// Shared configuration model the attribute is defined in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_configuration_model_id: Option<String>,
}

impl AttributeId {
    /// Create an id for an attribute of the root model.
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            component_path: Vec::new(),
            shared_configuration_model_id: None,
        }
    }

    /// Set the component path.
    pub fn with_component_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.component_path = path.into_iter().map(Into::into).collect();
        self
    }

    /// Set the shared configuration model.
    pub fn with_shared_model(mut self, model_id: impl Into<String>) -> Self {
        self.shared_configuration_model_id = Some(model_id.into());
        self
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref shared) = self.shared_configuration_model_id {
            write!(f, "{}{}", shared, SHARED_MODEL_SEPARATOR)?;
        }
        for segment in &self.component_path {
            write!(f, "{}{}", segment, PATH_SEPARATOR)?;
        }
        write!(f, "{}", self.local_id)
    }
}

/// Error returned when parsing an [`AttributeId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid attribute id '{0}'")]
pub struct ParseAttributeIdError(pub String);

impl FromStr for AttributeId {
    type Err = ParseAttributeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (shared, path) = match s.split_once(SHARED_MODEL_SEPARATOR) {
            Some((shared, path)) => (Some(shared), path),
            None => (None, s),
        };

        let mut segments: Vec<String> = path.split(PATH_SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(|seg| seg.trim().is_empty()) || shared.is_some_and(str::is_empty) {
            return Err(ParseAttributeIdError(s.to_string()));
        }

        // split always yields at least one segment
        let local_id = segments.pop().unwrap_or_default();
        Ok(Self {
            local_id,
            component_path: segments,
            shared_configuration_model_id: shared.map(str::to_string),
        })
    }
}

/// Whether a decision was made by the caller or derived by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    Implicit,
    Explicit,
}

/// Current decision on an attribute or choice value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision<T> {
    pub state: T,
    pub kind: DecisionKind,
}

impl<T> Decision<T> {
    pub fn explicit(state: T) -> Self {
        Self {
            state,
            kind: DecisionKind::Explicit,
        }
    }

    pub fn implicit(state: T) -> Self {
        Self {
            state,
            kind: DecisionKind::Implicit,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.kind == DecisionKind::Explicit
    }
}

/// Decision state of a single choice value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChoiceValueDecisionState {
    Included,
    Excluded,
}

/// Decision state of a component attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentDecisionState {
    Included,
    Excluded,
}

/// Inclusive value bounds of a numeric attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// How many values of a choice attribute may be included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cardinality {
    pub lower_bound: u32,
    pub upper_bound: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanAttribute {
    pub id: AttributeId,
    pub is_satisfied: bool,
    pub can_contribute_to_configuration_satisfaction: bool,
    pub possible_decision_states: Vec<bool>,
    pub decision: Option<Decision<bool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericAttribute {
    pub id: AttributeId,
    pub is_satisfied: bool,
    pub can_contribute_to_configuration_satisfaction: bool,
    pub range: NumericRange,
    pub decimal_places: u8,
    pub decision: Option<Decision<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceValue {
    pub id: String,
    pub possible_decision_states: Vec<ChoiceValueDecisionState>,
    pub decision: Option<Decision<ChoiceValueDecisionState>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceAttribute {
    pub id: AttributeId,
    pub is_satisfied: bool,
    pub can_contribute_to_configuration_satisfaction: bool,
    pub cardinality: Cardinality,
    pub values: BTreeMap<String, ChoiceValue>,
}

impl ChoiceAttribute {
    /// Ids of all values currently included.
    pub fn included_values(&self) -> impl Iterator<Item = &str> {
        self.values
            .values()
            .filter(|v| {
                v.decision
                    .is_some_and(|d| d.state == ChoiceValueDecisionState::Included)
            })
            .map(|v| v.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentAttribute {
    pub id: AttributeId,
    pub is_satisfied: bool,
    pub can_contribute_to_configuration_satisfaction: bool,
    pub possible_decision_states: Vec<ComponentDecisionState>,
    pub decision: Option<Decision<ComponentDecisionState>>,
}

/// An attribute of the configuration, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Attribute {
    Boolean(BooleanAttribute),
    Numeric(NumericAttribute),
    Choice(ChoiceAttribute),
    Component(ComponentAttribute),
}

impl Attribute {
    pub fn id(&self) -> &AttributeId {
        match self {
            Attribute::Boolean(a) => &a.id,
            Attribute::Numeric(a) => &a.id,
            Attribute::Choice(a) => &a.id,
            Attribute::Component(a) => &a.id,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        match self {
            Attribute::Boolean(a) => a.is_satisfied,
            Attribute::Numeric(a) => a.is_satisfied,
            Attribute::Choice(a) => a.is_satisfied,
            Attribute::Component(a) => a.is_satisfied,
        }
    }

    pub fn can_contribute_to_configuration_satisfaction(&self) -> bool {
        match self {
            Attribute::Boolean(a) => a.can_contribute_to_configuration_satisfaction,
            Attribute::Numeric(a) => a.can_contribute_to_configuration_satisfaction,
            Attribute::Choice(a) => a.can_contribute_to_configuration_satisfaction,
            Attribute::Component(a) => a.can_contribute_to_configuration_satisfaction,
        }
    }

    /// Short name of the variant, used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Attribute::Boolean(_) => "boolean",
            Attribute::Numeric(_) => "numeric",
            Attribute::Choice(_) => "choice",
            Attribute::Component(_) => "component",
        }
    }
}
