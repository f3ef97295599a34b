//! Failure taxonomy of the configurator SDK.
//!
//! Every operation against the engine either succeeds or yields exactly one
//! [`Failure`]. The set of variants is closed so callers can match
//! exhaustively and use the structured data for remediation.

use thiserror::Error;

use crate::attribute::{AttributeId, NumericRange};
use crate::decision::AttributeDecision;
use crate::explain::{ConstraintExplanation, DecisionExplanation};

/// Result type alias using [`Failure`].
pub type Result<T> = std::result::Result<T, Failure>;

/// Why the engine refused a single decision.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictReason {
    /// The value lies outside the currently possible range.
    NumericValueOutOfRange { range: NumericRange },
    /// The value has more decimal places than the attribute allows.
    NumericDecimalPlacesExceeded { decimal_places: u8 },
}

/// Classified outcome of a failed operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Failure {
    /// The engine could not be reached or the connection broke
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Credentials were rejected or the session expired
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    /// The request did not complete in time
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// The engine reported an internal error
    #[error("Service error ({status}): {message}")]
    ServiceError { status: u16, message: String },

    /// Anything that could not be classified
    #[error("Unknown error: {message}")]
    Unknown { message: String },

    #[error("Configuration model is invalid: {message}")]
    ModelInvalid { message: String },

    #[error("Configuration model is not feasible")]
    ModelNotFeasible {
        constraint_explanations: Vec<ConstraintExplanation>,
    },

    #[error("Configuration model not found{}", deployment_name.as_ref().map(|d| format!(": {}", d)).unwrap_or_default())]
    ModelNotFound { deployment_name: Option<String> },

    #[error("Session initialization failed: {message}")]
    InitializationFailure { message: String },

    #[error("Attribute not found: {attribute_id}")]
    AttributeNotFound { attribute_id: AttributeId },

    #[error("Choice value '{choice_value_id}' not found on attribute {attribute_id}")]
    ChoiceValueNotFound {
        attribute_id: AttributeId,
        choice_value_id: String,
    },

    #[error("Decision conflicts with the current consequences")]
    DecisionConflict { reason: Option<ConflictReason> },

    /// The solution is not among the current candidate solutions
    #[error("Solution is not available")]
    SolutionNotAvailable,

    /// A batch of decisions conflicts; explanations carry the ways out
    #[error("Decisions conflict ({} decision explanations)", decision_explanations.len())]
    SetManyConflict {
        constraint_explanations: Vec<ConstraintExplanation>,
        decision_explanations: Vec<DecisionExplanation>,
    },

    #[error("{} decisions were rejected", rejected.len())]
    RejectedDecisionsConflict { rejected: Vec<AttributeDecision> },

    #[error("Decisions to respect are invalid: {message}")]
    DecisionsToRespectInvalid { message: String },

    #[error("Explain question conflicts with the configuration")]
    ExplainConflict {
        constraint_explanations: Vec<ConstraintExplanation>,
    },

    #[error("Explain failed: {message}")]
    ExplainFailure { message: String },

    #[error("Access to deployment is forbidden{}", deployment_name.as_ref().map(|d| format!(": {}", d)).unwrap_or_default())]
    DeploymentForbidden { deployment_name: Option<String> },
}

impl Failure {
    /// Create a communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Failure::CommunicationError {
            message: message.into(),
        }
    }

    /// Create an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Failure::Unauthenticated {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Failure::Timeout {
            message: message.into(),
        }
    }

    /// Create an unknown error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Failure::Unknown {
            message: message.into(),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Failure::Unauthenticated { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Failure::Timeout { .. })
    }

    /// Whether the failure may go away by simply trying again.
    ///
    /// Unauthenticated is retryable only after the session id has been
    /// invalidated, so that the next attempt establishes a new session.
    pub fn is_retryable(&self) -> bool {
        self.is_unauthenticated() || self.is_timeout()
    }

    /// Get a recovery suggestion for this failure.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Failure::CommunicationError { .. } => Some("Check your network connection and the engine base URL"),
            Failure::Unauthenticated { .. } => Some("Check that your API key is valid and not expired"),
            Failure::Timeout { .. } => Some("Try again or raise engine.timeout_secs"),
            Failure::ServiceError { .. } => Some("The engine is having issues. Try again later"),
            Failure::ModelNotFound { .. } => Some("Check the deployment name and channel"),
            Failure::DeploymentForbidden { .. } => Some("The API key has no access to this deployment"),
            Failure::AttributeNotFound { .. } | Failure::ChoiceValueNotFound { .. } => {
                Some("Use 'show' to list the attributes of the configuration")
            }
            Failure::SolutionNotAvailable => Some("Run explain again to obtain current solutions"),
            Failure::SetManyConflict { .. } => Some("Apply one of the proposed solutions"),
            _ => None,
        }
    }
}

/// Format a failure with its recovery suggestion.
pub fn format_failure_with_suggestion(failure: &Failure) -> String {
    let mut output = failure.to_string();
    if let Some(suggestion) = failure.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}
