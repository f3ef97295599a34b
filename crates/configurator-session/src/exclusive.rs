//! Mutual exclusion of mutating operations.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

use configurator_core::{
    AttributeDecision, Configuration, ExplainAnswer, ExplainQuestion, ExplainSolution, Result,
    SessionContext, SessionId, SetManyMode,
};

use crate::decisions::StoredConfiguration;
use crate::traits::{ConfigurationChangedHandler, ConfigurationSession, SetManyResult};

/// Named exclusive scope of one session.
///
/// Waiters are served in FIFO order.
#[derive(Clone)]
pub struct ExclusiveScope {
    name: Arc<str>,
    lock: Arc<Mutex<()>>,
}

impl ExclusiveScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn enter(&self, operation: &'static str) -> MutexGuard<'_, ()> {
        trace!(scope = %self.name, operation, "Waiting for exclusive scope");
        let guard = self.lock.lock().await;
        trace!(scope = %self.name, operation, "Entered exclusive scope");
        guard
    }

    /// Owned variant of [`enter`](Self::enter), for spawned tasks.
    pub async fn enter_owned(&self, operation: &'static str) -> tokio::sync::OwnedMutexGuard<()> {
        trace!(scope = %self.name, operation, "Waiting for exclusive scope");
        self.lock.clone().lock_owned().await
    }
}

/// Runs at most one mutating operation of the wrapped session at a time.
///
/// Read-only accessors are not guarded and may return a snapshot that is
/// about to be superseded. Context switches are forwarded unguarded: the
/// coalescing layer underneath enters the same scope for every switch it
/// executes, so switches queued behind a busy scope can still be merged.
pub struct ExclusiveSession {
    inner: Arc<dyn ConfigurationSession>,
    scope: ExclusiveScope,
}

impl ExclusiveSession {
    pub fn new(inner: Arc<dyn ConfigurationSession>, scope: ExclusiveScope) -> Self {
        Self { inner, scope }
    }
}

#[async_trait]
impl ConfigurationSession for ExclusiveSession {
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
        let _guard = self.scope.enter("make_decision").await;
        self.inner.make_decision(decision).await
    }

    async fn set_many(
        &self,
        decisions: &[AttributeDecision],
        mode: &SetManyMode,
    ) -> Result<SetManyResult> {
        let _guard = self.scope.enter("set_many").await;
        self.inner.set_many(decisions, mode).await
    }

    async fn apply_solution(&self, solution: &ExplainSolution) -> Result<SetManyResult> {
        let _guard = self.scope.enter("apply_solution").await;
        self.inner.apply_solution(solution).await
    }

    async fn explain(&self, question: &ExplainQuestion) -> Result<ExplainAnswer> {
        let _guard = self.scope.enter("explain").await;
        self.inner.explain(question).await
    }

    async fn set_session_context(&self, context: &SessionContext) -> Result<()> {
        self.inner.set_session_context(context).await
    }

    async fn restore_configuration(&self, stored: &StoredConfiguration) -> Result<()> {
        let _guard = self.scope.enter("restore_configuration").await;
        self.inner.restore_configuration(stored).await
    }

    async fn close(&self) -> Result<()> {
        let _guard = self.scope.enter("close").await;
        self.inner.close().await
    }
}
