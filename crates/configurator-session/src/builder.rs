//! Assembly of a session from its layers.

use std::sync::Arc;

use tracing::info;

use configurator_client::EngineTransport;
use configurator_core::{Result, RetryConfig, SessionContext, SessionState};

use crate::coalesce::CoalescingSession;
use crate::exclusive::{ExclusiveScope, ExclusiveSession};
use crate::retry::RetryingSession;
use crate::session::SessionCore;
use crate::traits::{ConfigurationChangedHandler, ConfigurationSession};

/// Builds a session: mutual exclusion outermost, then coalescing of
/// context switches, then retry around the core.
pub struct SessionBuilder {
    transport: Arc<dyn EngineTransport>,
    state: SessionState,
    retry: RetryConfig,
    scope_name: String,
    handler: Option<ConfigurationChangedHandler>,
}

impl SessionBuilder {
    pub fn new(transport: Arc<dyn EngineTransport>, context: SessionContext) -> Self {
        Self {
            transport,
            state: SessionState::new(context),
            retry: RetryConfig::default(),
            scope_name: "configuration-session".to_string(),
            handler: None,
        }
    }

    /// Start from an existing snapshot instead of an empty one.
    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Name of the exclusive scope, shown in logs.
    pub fn with_scope_name(mut self, name: impl Into<String>) -> Self {
        self.scope_name = name.into();
        self
    }

    pub fn on_configuration_changed(mut self, handler: ConfigurationChangedHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Build a session that establishes its remote session on first use.
    pub fn build(self) -> Arc<dyn ConfigurationSession> {
        let core = Arc::new(SessionCore::with_state(self.transport, self.state));
        Self::compose(core, self.retry, self.scope_name, self.handler)
    }

    /// Build a session and establish its remote session right away.
    pub async fn connect(self) -> Result<Arc<dyn ConfigurationSession>> {
        let core = Arc::new(SessionCore::with_state(self.transport, self.state));
        if let Some(ref handler) = self.handler {
            core.set_on_configuration_changed_handler(Some(handler.clone()));
        }
        core.connect().await?;
        info!(session_id = ?core.session_id(), "Session connected");
        Ok(Self::compose(core, self.retry, self.scope_name, self.handler))
    }

    fn compose(
        core: Arc<SessionCore>,
        retry: RetryConfig,
        scope_name: String,
        handler: Option<ConfigurationChangedHandler>,
    ) -> Arc<dyn ConfigurationSession> {
        let scope = ExclusiveScope::new(scope_name);
        let retrying: Arc<dyn ConfigurationSession> = Arc::new(RetryingSession::new(core, retry));
        let coalescing: Arc<dyn ConfigurationSession> =
            Arc::new(CoalescingSession::new(retrying, scope.clone()));
        let session: Arc<dyn ConfigurationSession> =
            Arc::new(ExclusiveSession::new(coalescing, scope));

        if handler.is_some() {
            session.set_on_configuration_changed_handler(handler);
        }
        session
    }
}
