//! HTTP implementation of [`EngineTransport`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use configurator_core::config::LifetimeMode;
use configurator_core::{
    AttributeDecision, Config, ConsequencesDelta, DecisionResponse, DecisionsDelta, ExplainAnswer,
    ExplainQuestion, Result, SessionContext, SessionId, SetManyMode, SetManyResponse,
};

use crate::classify::{classify_problem, classify_request_error, classify_response};
use crate::error::ClientError;
use crate::lifetime::{ApiKeySessionLifetime, DelegatedSessionLifetime};
use crate::traits::{EngineTransport, SessionLifetime, SetManyOutcome};
use crate::wire::{problem, ProblemDetails, SetManyRequest};

/// Default header carrying the session id.
pub const DEFAULT_SESSION_ID_HEADER: &str = "X-Session-Id";

/// Transport talking JSON over HTTP to the engine.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    session_id_header: String,
    lifetime: Arc<dyn SessionLifetime>,
}

impl HttpTransport {
    /// Create a transport that creates and closes sessions through `lifetime`.
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        lifetime: Arc<dyn SessionLifetime>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_id_header: DEFAULT_SESSION_ID_HEADER.to_string(),
            lifetime,
        }
    }

    /// Build a transport and its lifetime back-end from configuration.
    pub fn from_config(config: &Config) -> std::result::Result<Self, ClientError> {
        let client = build_client(config.engine.timeout())?;
        let base_url = config.engine.base_url.trim_end_matches('/').to_string();

        let lifetime: Arc<dyn SessionLifetime> = match config.lifetime.mode {
            LifetimeMode::ApiKey => {
                let api_key =
                    config
                        .engine
                        .resolve_api_key()
                        .ok_or_else(|| ClientError::MissingApiKey {
                            env_var: config
                                .engine
                                .api_key_env
                                .clone()
                                .unwrap_or_else(|| "CONFIGURATOR_API_KEY".to_string()),
                        })?;
                Arc::new(
                    ApiKeySessionLifetime::new(client.clone(), base_url.clone(), api_key)
                        .with_session_id_header(config.engine.session_id_header.clone()),
                )
            }
            LifetimeMode::Delegated => {
                let create_url = config
                    .lifetime
                    .create_session_url
                    .clone()
                    .ok_or(ClientError::MissingDelegatedUrl("lifetime.create_session_url"))?;
                let close_url = config
                    .lifetime
                    .close_session_url
                    .clone()
                    .ok_or(ClientError::MissingDelegatedUrl("lifetime.close_session_url"))?;
                Arc::new(DelegatedSessionLifetime::new(client.clone(), create_url, close_url))
            }
        };

        Ok(Self::new(client, base_url, lifetime)
            .with_session_id_header(config.engine.session_id_header.clone()))
    }

    /// Set the header carrying the session id.
    pub fn with_session_id_header(mut self, header: impl Into<String>) -> Self {
        self.session_id_header = header.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn lifetime_name(&self) -> &str {
        self.lifetime.name()
    }

    fn session_request(&self, method: Method, path: &str, session_id: &SessionId) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, path))
            .header(self.session_id_header.as_str(), session_id.as_str())
    }
}

/// Build the shared HTTP client.
pub fn build_client(timeout: Duration) -> std::result::Result<Client, ClientError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Send a request, classify failures and decode a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = send(request).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| classify_request_error(&e))
}

async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_request_error(&e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "Engine returned an error: {}", body);
    Err(classify_response(status, &body))
}

#[async_trait]
impl EngineTransport for HttpTransport {
    #[instrument(skip(self, context), fields(lifetime = %self.lifetime.name()))]
    async fn create_session(&self, context: &SessionContext) -> Result<SessionId> {
        self.lifetime.create(context).await
    }

    #[instrument(skip(self), fields(lifetime = %self.lifetime.name()))]
    async fn close_session(&self, session_id: &SessionId) -> Result<()> {
        self.lifetime.close(session_id).await
    }

    #[instrument(skip(self, decision), fields(attribute = %decision.attribute_id()))]
    async fn decide(
        &self,
        session_id: &SessionId,
        decision: &AttributeDecision,
    ) -> Result<DecisionResponse> {
        send_json(
            self.session_request(Method::PUT, "session/decision", session_id)
                .json(decision),
        )
        .await
    }

    #[instrument(skip(self, decisions, mode), fields(count = decisions.len()))]
    async fn set_many(
        &self,
        session_id: &SessionId,
        decisions: &[AttributeDecision],
        mode: &SetManyMode,
    ) -> Result<SetManyOutcome> {
        let request = self
            .session_request(Method::PUT, "session/decisions", session_id)
            .json(&SetManyRequest { decisions, mode });

        let response = request
            .send()
            .await
            .map_err(|e| classify_request_error(&e))?;

        let status = response.status();
        if status.is_success() {
            let applied: SetManyResponse = response
                .json()
                .await
                .map_err(|e| classify_request_error(&e))?;
            return Ok(SetManyOutcome::Applied(applied));
        }

        let body = response.text().await.unwrap_or_default();
        let problem: ProblemDetails = serde_json::from_str(&body).unwrap_or_default();
        if problem.is(problem::SET_MANY_CONFLICT) {
            debug!(
                explanations = problem.decision_explanations.len(),
                "Batch of decisions conflicts"
            );
            return Ok(SetManyOutcome::Conflict(problem.into_explain_answer()));
        }

        if problem.problem_type.is_none() {
            return Err(classify_response(status, &body));
        }
        Err(classify_problem(status, problem))
    }

    #[instrument(skip(self))]
    async fn get_decisions(&self, session_id: &SessionId) -> Result<DecisionsDelta> {
        send_json(self.session_request(Method::GET, "session/decisions", session_id)).await
    }

    #[instrument(skip(self))]
    async fn get_consequences(&self, session_id: &SessionId) -> Result<ConsequencesDelta> {
        send_json(self.session_request(Method::GET, "session/consequences", session_id)).await
    }

    #[instrument(skip(self, question), fields(answer_type = ?question.answer_type()))]
    async fn explain(
        &self,
        session_id: &SessionId,
        question: &ExplainQuestion,
    ) -> Result<ExplainAnswer> {
        let answer: ExplainAnswer = send_json(
            self.session_request(Method::POST, "session/explain", session_id)
                .json(question),
        )
        .await?;

        if answer.constraint_explanations.is_empty() && answer.decision_explanations.is_empty() {
            debug!("Explain answer is empty");
        }
        Ok(answer)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("session_id_header", &self.session_id_header)
            .field("lifetime", &self.lifetime.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedLifetime;

    #[async_trait]
    impl SessionLifetime for NamedLifetime {
        fn name(&self) -> &str {
            "named"
        }

        async fn create(&self, _context: &SessionContext) -> Result<SessionId> {
            Ok(SessionId::new("s-1"))
        }

        async fn close(&self, _session_id: &SessionId) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = HttpTransport::new(
            Client::new(),
            "https://engine.local/api/",
            Arc::new(NamedLifetime),
        );
        assert_eq!(transport.base_url(), "https://engine.local/api");
        assert_eq!(transport.lifetime_name(), "named");
    }

    #[test]
    fn test_from_config_delegated_requires_urls() {
        let mut config = Config::default();
        config.lifetime.mode = LifetimeMode::Delegated;
        config.lifetime.create_session_url = Some("https://shop.example/session".into());
        let err = HttpTransport::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ClientError::MissingDelegatedUrl("lifetime.close_session_url")
        ));
    }

    #[test]
    fn test_from_config_api_key_mode() {
        let mut config = Config::default();
        config.engine.api_key = Some("secret".into());
        config.engine.session_id_header = "X-Engine-Session".into();
        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(transport.lifetime_name(), "api-key");
        assert_eq!(transport.session_id_header, "X-Engine-Session");
    }

    #[tokio::test]
    async fn test_create_session_delegates_to_lifetime() {
        let transport = HttpTransport::new(Client::new(), "http://localhost", Arc::new(NamedLifetime));
        let context = SessionContext::new(configurator_core::ConfigurationModelSource::channel(
            "Car", "release",
        ));
        let id = transport.create_session(&context).await.unwrap();
        assert_eq!(id, SessionId::new("s-1"));
    }
}
