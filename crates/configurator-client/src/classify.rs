//! Mapping of transport outcomes onto the failure taxonomy.

use reqwest::StatusCode;
use tracing::warn;

use configurator_core::{ConflictReason, Failure};

use crate::wire::{problem, ProblemDetails};

/// Classify an error raised by the HTTP client before a response arrived.
pub fn classify_request_error(err: &reqwest::Error) -> Failure {
    if err.is_timeout() {
        return Failure::timeout(err.to_string());
    }
    if err.is_decode() {
        return Failure::unknown(format!("malformed response: {}", err));
    }
    if err.is_connect() || err.is_request() || err.is_body() {
        return Failure::communication(err.to_string());
    }
    Failure::unknown(err.to_string())
}

/// Classify an error response from its status and raw body.
pub fn classify_response(status: StatusCode, body: &str) -> Failure {
    let problem: ProblemDetails = match serde_json::from_str(body) {
        Ok(problem) => problem,
        Err(_) => ProblemDetails {
            detail: (!body.trim().is_empty()).then(|| body.trim().to_string()),
            ..Default::default()
        },
    };
    classify_problem(status, problem)
}

/// Classify a parsed problem-details body.
pub fn classify_problem(status: StatusCode, problem: ProblemDetails) -> Failure {
    let message = problem.message();

    match status {
        StatusCode::UNAUTHORIZED => return Failure::Unauthenticated { message },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            return Failure::Timeout { message }
        }
        s if s.is_server_error() => {
            return Failure::ServiceError {
                status: s.as_u16(),
                message,
            }
        }
        _ => {}
    }

    let Some(problem_type) = problem.problem_type.clone() else {
        warn!(status = status.as_u16(), "Untyped engine error: {}", message);
        return Failure::Unknown {
            message: format!("{}: {}", status, message),
        };
    };

    match problem_type.as_str() {
        problem::SESSION_NOT_FOUND | problem::UNAUTHENTICATED => Failure::Unauthenticated { message },
        problem::DEPLOYMENT_FORBIDDEN => Failure::DeploymentForbidden {
            deployment_name: problem.deployment_name,
        },
        problem::MODEL_NOT_FOUND => Failure::ModelNotFound {
            deployment_name: problem.deployment_name,
        },
        problem::MODEL_INVALID => Failure::ModelInvalid { message },
        problem::MODEL_NOT_FEASIBLE => Failure::ModelNotFeasible {
            constraint_explanations: problem.constraint_explanations,
        },
        problem::INITIALIZATION_FAILURE => Failure::InitializationFailure { message },
        problem::ATTRIBUTE_NOT_FOUND | problem::CHOICE_VALUE_NOT_FOUND => {
            match (problem.attribute_id, problem.choice_value_id) {
                (Some(attribute_id), Some(choice_value_id)) => Failure::ChoiceValueNotFound {
                    attribute_id,
                    choice_value_id,
                },
                (Some(attribute_id), None) => Failure::AttributeNotFound { attribute_id },
                (None, _) => Failure::Unknown { message },
            }
        }
        problem::DECISION_CONFLICT => Failure::DecisionConflict { reason: None },
        problem::NUMERIC_OUT_OF_RANGE => Failure::DecisionConflict {
            reason: problem
                .range
                .map(|range| ConflictReason::NumericValueOutOfRange { range }),
        },
        problem::NUMERIC_DECIMAL_PLACES => Failure::DecisionConflict {
            reason: problem
                .decimal_places
                .map(|decimal_places| ConflictReason::NumericDecimalPlacesExceeded { decimal_places }),
        },
        problem::SET_MANY_CONFLICT => Failure::SetManyConflict {
            constraint_explanations: problem.constraint_explanations,
            decision_explanations: problem.decision_explanations,
        },
        problem::REJECTED_DECISIONS => Failure::RejectedDecisionsConflict {
            rejected: problem.rejected_decisions,
        },
        problem::DECISIONS_TO_RESPECT_INVALID => Failure::DecisionsToRespectInvalid { message },
        problem::EXPLAIN_CONFLICT => Failure::ExplainConflict {
            constraint_explanations: problem.constraint_explanations,
        },
        problem::EXPLAIN_FAILURE => Failure::ExplainFailure { message },
        other => {
            warn!(status = status.as_u16(), problem_type = other, "Unrecognized engine problem type");
            Failure::Unknown {
                message: format!("{}: {}", other, message),
            }
        }
    }
}
