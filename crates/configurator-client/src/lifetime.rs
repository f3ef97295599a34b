//! Session lifetime back-ends.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};

use configurator_core::{Failure, Result, SessionContext, SessionId};

use crate::classify::{classify_request_error, classify_response};
use crate::http::{send_json, DEFAULT_SESSION_ID_HEADER};
use crate::traits::SessionLifetime;
use crate::wire::{CloseSessionRequest, CreateSessionResponse};

/// Creates and closes sessions directly against the engine with an API key.
pub struct ApiKeySessionLifetime {
    client: Client,
    base_url: String,
    api_key: String,
    session_id_header: String,
}

impl ApiKeySessionLifetime {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session_id_header: DEFAULT_SESSION_ID_HEADER.to_string(),
        }
    }

    pub fn with_session_id_header(mut self, header: impl Into<String>) -> Self {
        self.session_id_header = header.into();
        self
    }
}

#[async_trait]
impl SessionLifetime for ApiKeySessionLifetime {
    fn name(&self) -> &str {
        "api-key"
    }

    #[instrument(skip(self, context), fields(deployment = ?context.model_source.deployment_name()))]
    async fn create(&self, context: &SessionContext) -> Result<SessionId> {
        let response: CreateSessionResponse = send_json(
            self.client
                .post(format!("{}/session", self.base_url))
                .bearer_auth(&self.api_key)
                .json(context),
        )
        .await?;

        info!(session_id = %response.session_id, "Session created");
        Ok(response.session_id)
    }

    #[instrument(skip(self))]
    async fn close(&self, session_id: &SessionId) -> Result<()> {
        let request = self
            .client
            .delete(format!("{}/session", self.base_url))
            .bearer_auth(&self.api_key)
            .header(self.session_id_header.as_str(), session_id.as_str());
        close_tolerating_missing(request).await
    }
}

/// Creates and closes sessions through caller-owned endpoints, which keep
/// the API key server-side.
pub struct DelegatedSessionLifetime {
    client: Client,
    create_session_url: String,
    close_session_url: String,
}

impl DelegatedSessionLifetime {
    pub fn new(
        client: Client,
        create_session_url: impl Into<String>,
        close_session_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            create_session_url: create_session_url.into(),
            close_session_url: close_session_url.into(),
        }
    }
}

#[async_trait]
impl SessionLifetime for DelegatedSessionLifetime {
    fn name(&self) -> &str {
        "delegated"
    }

    #[instrument(skip(self, context), fields(url = %self.create_session_url))]
    async fn create(&self, context: &SessionContext) -> Result<SessionId> {
        let response: CreateSessionResponse = send_json(
            self.client
                .post(self.create_session_url.as_str())
                .json(context),
        )
        .await?;

        info!(session_id = %response.session_id, "Session created through delegate");
        Ok(response.session_id)
    }

    #[instrument(skip(self), fields(url = %self.close_session_url))]
    async fn close(&self, session_id: &SessionId) -> Result<()> {
        let request = self
            .client
            .post(self.close_session_url.as_str())
            .json(&CloseSessionRequest { session_id });
        close_tolerating_missing(request).await
    }
}

/// A session that no longer exists counts as closed.
async fn close_tolerating_missing(request: reqwest::RequestBuilder) -> Result<()> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_request_error(&e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
        debug!("Session already gone");
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    match classify_response(status, &body) {
        Failure::Unauthenticated { .. } => {
            debug!("Session expired before close");
            Ok(())
        }
        other => Err(other),
    }
}
