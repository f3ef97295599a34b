//! Session identity, context and the immutable session snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeId};
use crate::decision::ExplainSolution;

/// Server-side handle of one configuration-in-progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the engine loads the configuration model from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ConfigurationModelSource {
    /// A deployed model, resolved through a release channel.
    Channel {
        deployment_name: String,
        channel: String,
    },
    /// A model package uploaded with the session request.
    Package { package_base64: String },
}

impl ConfigurationModelSource {
    pub fn channel(deployment_name: impl Into<String>, channel: impl Into<String>) -> Self {
        ConfigurationModelSource::Channel {
            deployment_name: deployment_name.into(),
            channel: channel.into(),
        }
    }

    /// Deployment name, when the model comes from a deployment.
    pub fn deployment_name(&self) -> Option<&str> {
        match self {
            ConfigurationModelSource::Channel {
                deployment_name, ..
            } => Some(deployment_name),
            ConfigurationModelSource::Package { .. } => None,
        }
    }
}

/// Which rules the engine may reveal in explanations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AllowedInExplain {
    #[default]
    All,
    None,
    Specific { rules: Vec<String> },
}

/// Everything a session is created from.
///
/// Compared structurally: switching to an equal context is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub model_source: ConfigurationModelSource,
    #[serde(default)]
    pub usage_rule_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub allowed_in_explain: Option<AllowedInExplain>,
}

impl SessionContext {
    pub fn new(model_source: ConfigurationModelSource) -> Self {
        Self {
            model_source,
            usage_rule_parameters: BTreeMap::new(),
            allowed_in_explain: None,
        }
    }

    pub fn with_usage_rule_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.usage_rule_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_allowed_in_explain(mut self, allowed: AllowedInExplain) -> Self {
        self.allowed_in_explain = Some(allowed);
        self
    }
}

/// Full local view of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub is_satisfied: bool,
    #[serde(with = "attributes_as_list")]
    pub attributes: BTreeMap<AttributeId, Attribute>,
}

impl Configuration {
    pub fn attribute(&self, id: &AttributeId) -> Option<&Attribute> {
        self.attributes.get(id)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Attribute maps travel as plain lists; the id is part of each attribute.
mod attributes_as_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::attribute::{Attribute, AttributeId};

    pub fn serialize<S>(attributes: &BTreeMap<AttributeId, Attribute>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(attributes.values())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<AttributeId, Attribute>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list = Vec::<Attribute>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|a| (a.id().clone(), a)).collect())
    }
}

/// Immutable snapshot of a session.
///
/// Every successful mutating operation replaces the snapshot wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Absent when no session is established or it was invalidated
    pub session_id: Option<SessionId>,
    pub configuration: Arc<Configuration>,
    pub context: SessionContext,
    /// Candidate solutions from the last conflict or explain answer
    pub solutions: Vec<ExplainSolution>,
}

impl SessionState {
    /// Snapshot of a context with no session established yet.
    pub fn new(context: SessionContext) -> Self {
        Self {
            session_id: None,
            configuration: Arc::new(Configuration::default()),
            context,
            solutions: Vec::new(),
        }
    }

    pub fn has_session(&self) -> bool {
        self.session_id.is_some()
    }

    pub fn with_session_id(mut self, session_id: Option<SessionId>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Arc::new(configuration);
        self
    }

    pub fn with_context(mut self, context: SessionContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_solutions(mut self, solutions: Vec<ExplainSolution>) -> Self {
        self.solutions = solutions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_structural_equality() {
        let a = SessionContext::new(ConfigurationModelSource::channel("Car", "release"))
            .with_usage_rule_parameter("market", "DE");
        let b = SessionContext::new(ConfigurationModelSource::channel("Car", "release"))
            .with_usage_rule_parameter("market", "DE");
        let c = b.clone().with_usage_rule_parameter("market", "US");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_new_state_has_no_session() {
        let state = SessionState::new(SessionContext::new(ConfigurationModelSource::channel(
            "Car", "release",
        )));
        assert!(!state.has_session());
        assert!(state.configuration.is_empty());
        assert!(state.solutions.is_empty());
    }

    #[test]
    fn test_configuration_serializes_attributes_as_list() {
        use crate::attribute::{BooleanAttribute, Attribute};

        let id = AttributeId::new("Heated");
        let mut configuration = Configuration::default();
        configuration.attributes.insert(
            id.clone(),
            Attribute::Boolean(BooleanAttribute {
                id: id.clone(),
                is_satisfied: true,
                can_contribute_to_configuration_satisfaction: false,
                possible_decision_states: vec![true, false],
                decision: None,
            }),
        );

        let json = serde_json::to_string(&configuration).unwrap();
        let back: Configuration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, configuration);
        assert!(json.contains("\"attributes\":[{\"type\":\"Boolean\""));
    }

    #[test]
    fn test_context_serialization() {
        let context = SessionContext::new(ConfigurationModelSource::channel("Car", "release"));
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["modelSource"]["type"], "Channel");
        assert_eq!(json["modelSource"]["deploymentName"], "Car");
    }
}
