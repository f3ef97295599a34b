//! Creation, re-creation and closing of remote sessions.

use std::sync::Arc;

use tracing::{debug, info, warn};

use configurator_client::{EngineTransport, SetManyOutcome};
use configurator_core::{
    AttributeDecision, Configuration, Failure, Result, SessionId, SessionState, SetManyMode,
};

use crate::decisions::explicit_decisions;
use crate::merge::merge;

/// Drives session creation and teardown against the transport.
///
/// Every method takes the current snapshot by reference and returns the
/// next one; the caller decides when to swap it in.
#[derive(Clone)]
pub struct SessionLifecycle {
    transport: Arc<dyn EngineTransport>,
}

impl SessionLifecycle {
    pub fn new(transport: Arc<dyn EngineTransport>) -> Self {
        Self { transport }
    }

    /// Discard any prior session and start a fresh one, without replaying
    /// decisions.
    pub async fn recreate(&self, state: &SessionState) -> Result<SessionState> {
        self.close_quietly(state.session_id.as_ref()).await;

        let session_id = self.transport.create_session(&state.context).await?;
        let configuration = self.established(&session_id, self.fetch(&session_id)).await?;

        Ok(state
            .clone()
            .with_session_id(Some(session_id))
            .with_configuration(configuration)
            .with_solutions(Vec::new()))
    }

    /// Make the snapshot's explicit decisions authoritative again on a live
    /// session, creating one if none is held.
    pub async fn reinitialize(&self, state: &SessionState) -> Result<SessionState> {
        let decisions = explicit_decisions(&state.configuration);

        let (session_id, configuration) = match &state.session_id {
            Some(session_id) => {
                debug!(session_id = %session_id, "Reinitializing live session");
                let configuration = self.replay_and_fetch(session_id, &decisions).await?;
                (session_id.clone(), configuration)
            }
            None => {
                let session_id = self.transport.create_session(&state.context).await?;
                let configuration = self
                    .established(&session_id, self.replay_and_fetch(&session_id, &decisions))
                    .await?;
                (session_id, configuration)
            }
        };

        Ok(state
            .clone()
            .with_session_id(Some(session_id))
            .with_configuration(configuration))
    }

    /// Close the prior session, then apply `decisions` to a fresh one.
    pub async fn restore(
        &self,
        state: &SessionState,
        decisions: &[AttributeDecision],
    ) -> Result<SessionState> {
        self.close_quietly(state.session_id.as_ref()).await;

        let session_id = self.transport.create_session(&state.context).await?;
        let configuration = self
            .established(&session_id, self.replay_and_fetch(&session_id, decisions))
            .await?;

        info!(session_id = %session_id, decisions = decisions.len(), "Configuration restored");
        Ok(state
            .clone()
            .with_session_id(Some(session_id))
            .with_configuration(configuration)
            .with_solutions(Vec::new()))
    }

    /// Close a session. Without a session id, or when the engine no longer
    /// knows the session, this succeeds without effect.
    pub async fn close(&self, session_id: Option<&SessionId>) -> Result<()> {
        let Some(session_id) = session_id else {
            debug!("No session to close");
            return Ok(());
        };

        match self.transport.close_session(session_id).await {
            Ok(()) => {
                info!(session_id = %session_id, "Session closed");
                Ok(())
            }
            Err(failure) if failure.is_unauthenticated() => {
                debug!(session_id = %session_id, "Session already gone");
                Ok(())
            }
            Err(failure) => Err(failure),
        }
    }

    /// Close, logging instead of failing.
    pub async fn close_quietly(&self, session_id: Option<&SessionId>) {
        if let Err(failure) = self.close(session_id).await {
            warn!("Failed to close previous session: {}", failure);
        }
    }

    async fn replay_and_fetch(
        &self,
        session_id: &SessionId,
        decisions: &[AttributeDecision],
    ) -> Result<Configuration> {
        self.replay(session_id, decisions).await?;
        self.fetch(session_id).await
    }

    async fn replay(&self, session_id: &SessionId, decisions: &[AttributeDecision]) -> Result<()> {
        if decisions.is_empty() {
            return Ok(());
        }

        debug!(count = decisions.len(), "Replaying explicit decisions");
        match self
            .transport
            .set_many(session_id, decisions, &SetManyMode::drop_existing_automatic())
            .await?
        {
            SetManyOutcome::Applied(response) => {
                if !response.rejected_decisions.is_empty() {
                    warn!(
                        rejected = response.rejected_decisions.len(),
                        "Engine rejected replayed decisions"
                    );
                }
                Ok(())
            }
            SetManyOutcome::Conflict(answer) => Err(Failure::SetManyConflict {
                constraint_explanations: answer.constraint_explanations,
                decision_explanations: answer.decision_explanations,
            }),
        }
    }

    /// Read the full server-side state and build a configuration from it.
    async fn fetch(&self, session_id: &SessionId) -> Result<Configuration> {
        let (decisions, consequences) = tokio::try_join!(
            self.transport.get_decisions(session_id),
            self.transport.get_consequences(session_id),
        )?;
        Ok(merge(&Configuration::default(), &consequences, &decisions))
    }

    /// Await setup work on a session created for it; a failed setup closes
    /// the new session again.
    async fn established<T>(
        &self,
        session_id: &SessionId,
        setup: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match setup.await {
            Ok(value) => Ok(value),
            Err(failure) => {
                self.close_quietly(Some(session_id)).await;
                Err(failure)
            }
        }
    }
}
