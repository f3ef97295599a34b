//! Transport trait definitions.
//!
//! The session runtime never talks HTTP itself. It drives an
//! [`EngineTransport`], which issues the requests and hands back results that
//! are already classified into the [`Failure`](configurator_core::Failure)
//! taxonomy.

use async_trait::async_trait;

use configurator_core::{
    AttributeDecision, ConsequencesDelta, DecisionResponse, DecisionsDelta, ExplainAnswer,
    ExplainQuestion, Result, SessionContext, SessionId, SetManyMode, SetManyResponse,
};

/// Outcome of a batch of decisions.
#[derive(Debug, Clone, PartialEq)]
pub enum SetManyOutcome {
    /// The batch was applied.
    Applied(SetManyResponse),
    /// The batch conflicts and nothing was applied; the answer proposes
    /// solutions.
    Conflict(ExplainAnswer),
}

/// Operations of the remote engine, scoped to a session.
#[async_trait]
pub trait EngineTransport: Send + Sync {
    /// Create a session for the given context.
    async fn create_session(&self, context: &SessionContext) -> Result<SessionId>;

    /// Close a session. Closing an already closed session succeeds.
    async fn close_session(&self, session_id: &SessionId) -> Result<()>;

    /// Apply a single decision.
    async fn decide(
        &self,
        session_id: &SessionId,
        decision: &AttributeDecision,
    ) -> Result<DecisionResponse>;

    /// Apply a batch of decisions.
    async fn set_many(
        &self,
        session_id: &SessionId,
        decisions: &[AttributeDecision],
        mode: &SetManyMode,
    ) -> Result<SetManyOutcome>;

    /// Read all current decisions.
    async fn get_decisions(&self, session_id: &SessionId) -> Result<DecisionsDelta>;

    /// Read all current consequences.
    async fn get_consequences(&self, session_id: &SessionId) -> Result<ConsequencesDelta>;

    /// Ask why something is not satisfied or why a state is not possible.
    async fn explain(
        &self,
        session_id: &SessionId,
        question: &ExplainQuestion,
    ) -> Result<ExplainAnswer>;
}

/// Back-end that creates and closes sessions.
///
/// Sessions are either created directly with an API key, or through
/// endpoints owned by the caller that keep the key server-side.
#[async_trait]
pub trait SessionLifetime: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    async fn create(&self, context: &SessionContext) -> Result<SessionId>;

    async fn close(&self, session_id: &SessionId) -> Result<()>;
}
