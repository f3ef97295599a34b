//! The public operation set of a configuration session.

use std::sync::Arc;

use async_trait::async_trait;

use configurator_core::{
    AttributeDecision, Configuration, ExplainAnswer, ExplainQuestion, ExplainSolution, Result,
    SessionContext, SessionId, SetManyMode,
};

use crate::decisions::StoredConfiguration;

/// Observer invoked with the new configuration after it was swapped in.
pub type ConfigurationChangedHandler = Arc<dyn Fn(Arc<Configuration>) + Send + Sync>;

/// Result of an applied batch of decisions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetManyResult {
    /// Decisions the engine did not apply; the rest of the batch was applied.
    pub rejected_decisions: Vec<AttributeDecision>,
}

/// A configuration session.
///
/// Implemented by the session core and by each concurrency layer wrapped
/// around it, so layers compose by forwarding to an inner session.
#[async_trait]
pub trait ConfigurationSession: Send + Sync {
    /// Current configuration. May be superseded by an operation in flight.
    fn configuration(&self) -> Arc<Configuration>;

    fn session_context(&self) -> SessionContext;

    fn session_id(&self) -> Option<SessionId>;

    /// Candidate solutions of the last conflict or explain answer.
    fn solutions(&self) -> Vec<ExplainSolution>;

    /// Register or clear the single configuration observer.
    fn set_on_configuration_changed_handler(&self, handler: Option<ConfigurationChangedHandler>);

    /// Forget the session id without contacting the engine. The next
    /// operation establishes a new session.
    fn invalidate_session_id(&self);

    async fn make_decision(&self, decision: &AttributeDecision) -> Result<()>;

    async fn set_many(
        &self,
        decisions: &[AttributeDecision],
        mode: &SetManyMode,
    ) -> Result<SetManyResult>;

    /// Apply one of the current candidate solutions.
    async fn apply_solution(&self, solution: &ExplainSolution) -> Result<SetManyResult>;

    async fn explain(&self, question: &ExplainQuestion) -> Result<ExplainAnswer>;

    /// Switch to another context, carrying the explicit decisions over.
    async fn set_session_context(&self, context: &SessionContext) -> Result<()>;

    /// Replace the configuration with a stored one, in a fresh session.
    async fn restore_configuration(&self, stored: &StoredConfiguration) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
