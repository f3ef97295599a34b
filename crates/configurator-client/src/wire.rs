//! Request and response envelopes of the engine's HTTP API.
//!
//! Domain payloads (decisions, deltas, explain types) serialize as-is; this
//! module only adds the envelopes around them and the problem-details body
//! the engine uses for errors.

use serde::{Deserialize, Serialize};

use configurator_core::{
    AttributeDecision, AttributeId, ConstraintExplanation, DecisionExplanation, ExplainAnswer,
    NumericRange, SessionId, SetManyMode,
};

/// Problem types reported by the engine in error bodies.
pub mod problem {
    pub const SESSION_NOT_FOUND: &str = "SessionNotFound";
    pub const UNAUTHENTICATED: &str = "Unauthenticated";
    pub const DEPLOYMENT_FORBIDDEN: &str = "DeploymentForbidden";
    pub const MODEL_NOT_FOUND: &str = "ConfigurationModelNotFound";
    pub const MODEL_INVALID: &str = "ConfigurationModelInvalid";
    pub const MODEL_NOT_FEASIBLE: &str = "ConfigurationModelNotFeasible";
    pub const INITIALIZATION_FAILURE: &str = "SessionInitializationFailure";
    pub const ATTRIBUTE_NOT_FOUND: &str = "AttributeNotFound";
    pub const CHOICE_VALUE_NOT_FOUND: &str = "ChoiceValueNotFound";
    pub const DECISION_CONFLICT: &str = "ConflictWithConsequence";
    pub const NUMERIC_OUT_OF_RANGE: &str = "NumericDecisionOutOfRange";
    pub const NUMERIC_DECIMAL_PLACES: &str = "NumericDecisionDecimalPlacesExceeded";
    pub const SET_MANY_CONFLICT: &str = "SetManyConflict";
    pub const REJECTED_DECISIONS: &str = "DecisionsRejected";
    pub const DECISIONS_TO_RESPECT_INVALID: &str = "DecisionsToRespectInvalid";
    pub const EXPLAIN_CONFLICT: &str = "ExplainConflict";
    pub const EXPLAIN_FAILURE: &str = "ExplainFailure";
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionRequest<'a> {
    pub session_id: &'a SessionId,
}

#[derive(Debug, Serialize)]
pub struct SetManyRequest<'a> {
    pub decisions: &'a [AttributeDecision],
    pub mode: &'a SetManyMode,
}

/// Error body of the engine (RFC 7807 problem details with extensions).
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: Option<String>,
    pub title: Option<String>,
    pub detail: Option<String>,
    pub attribute_id: Option<AttributeId>,
    pub choice_value_id: Option<String>,
    pub deployment_name: Option<String>,
    pub range: Option<NumericRange>,
    pub decimal_places: Option<u8>,
    pub constraint_explanations: Vec<ConstraintExplanation>,
    pub decision_explanations: Vec<DecisionExplanation>,
    pub rejected_decisions: Vec<AttributeDecision>,
}

impl ProblemDetails {
    /// Best human-readable description available.
    pub fn message(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .or_else(|| self.problem_type.clone())
            .unwrap_or_else(|| "no details".to_string())
    }

    pub fn is(&self, problem_type: &str) -> bool {
        self.problem_type.as_deref() == Some(problem_type)
    }

    /// The explanations of a conflict, as an explain answer.
    pub fn into_explain_answer(self) -> ExplainAnswer {
        ExplainAnswer {
            constraint_explanations: self.constraint_explanations,
            decision_explanations: self.decision_explanations,
        }
    }
}
