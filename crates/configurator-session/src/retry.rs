//! Retry layer for expired sessions and timeouts.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use configurator_core::{
    AttributeDecision, Configuration, ExplainAnswer, ExplainQuestion, ExplainSolution, Result,
    RetryConfig, SessionContext, SessionId, SetManyMode,
};

use crate::decisions::StoredConfiguration;
use crate::traits::{ConfigurationChangedHandler, ConfigurationSession, SetManyResult};

/// Retries operations that failed because the session expired or the engine
/// timed out.
///
/// Before retrying an unauthenticated failure the inner session id is
/// invalidated, so the next attempt establishes a new session and replays
/// the explicit decisions. Every other failure surfaces immediately.
/// `close` is never retried.
pub struct RetryingSession {
    inner: Arc<dyn ConfigurationSession>,
    config: RetryConfig,
}

impl RetryingSession {
    pub fn new(inner: Arc<dyn ConfigurationSession>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(failure) if failure.is_retryable() && attempt + 1 < max_attempts => {
                    if failure.is_unauthenticated() {
                        self.inner.invalidate_session_id();
                    }
                    let delay = self.config.delay_for_attempt(attempt);
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{}, retrying",
                        failure
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}

#[async_trait]
impl ConfigurationSession for RetryingSession {
    fn configuration(&self) -> Arc<Configuration> {
        self.inner.configuration()
    }

    fn session_context(&self) -> SessionContext {
        self.inner.session_context()
    }

    fn session_id(&self) -> Option<SessionId> {
        self.inner.session_id()
    }

    fn solutions(&self) -> Vec<ExplainSolution> {
        self.inner.solutions()
    }

    fn set_on_configuration_changed_handler(&self, handler: Option<ConfigurationChangedHandler>) {
        self.inner.set_on_configuration_changed_handler(handler)
    }

    fn invalidate_session_id(&self) {
        self.inner.invalidate_session_id()
    }

    async fn make_decision(&self, decision: &AttributeDecision) -> Result<()> {
        self.with_retry("make_decision", || self.inner.make_decision(decision))
            .await
    }

    async fn set_many(
        &self,
        decisions: &[AttributeDecision],
        mode: &SetManyMode,
    ) -> Result<SetManyResult> {
        self.with_retry("set_many", || self.inner.set_many(decisions, mode))
            .await
    }

    async fn apply_solution(&self, solution: &ExplainSolution) -> Result<SetManyResult> {
        self.with_retry("apply_solution", || self.inner.apply_solution(solution))
            .await
    }

    async fn explain(&self, question: &ExplainQuestion) -> Result<ExplainAnswer> {
        self.with_retry("explain", || self.inner.explain(question))
            .await
    }

    async fn set_session_context(&self, context: &SessionContext) -> Result<()> {
        self.with_retry("set_session_context", || self.inner.set_session_context(context))
            .await
    }

    async fn restore_configuration(&self, stored: &StoredConfiguration) -> Result<()> {
        self.with_retry("restore_configuration", || {
            self.inner.restore_configuration(stored)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
