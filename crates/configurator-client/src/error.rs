//! Errors raised while building a transport.

use thiserror::Error;

use configurator_core::Failure;

use crate::classify::classify_request_error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("No API key configured (set engine.api_key or the {env_var} environment variable)")]
    MissingApiKey { env_var: String },

    #[error("Delegated lifetime mode requires {0}")]
    MissingDelegatedUrl(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Surface a missing API key as a classified failure.
impl From<ClientError> for Failure {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::MissingApiKey { .. } => Failure::unauthenticated(err.to_string()),
            ClientError::MissingDelegatedUrl(_) => Failure::InitializationFailure {
                message: err.to_string(),
            },
            ClientError::Http(e) => classify_request_error(&e),
        }
    }
}
