//! The session core: owns the snapshot and executes operations.
//!
//! The core holds exactly one [`SessionState`] at a time and replaces it
//! wholesale after every successful operation. It performs no locking of
//! its own beyond the snapshot swap; serialization of operations is the job
//! of the layers wrapped around it.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use configurator_client::{EngineTransport, SetManyOutcome};
use configurator_core::{
    AttributeDecision, Configuration, ExplainAnswer, ExplainQuestion, ExplainSolution, Failure,
    Result, SessionContext, SessionId, SessionState, SetManyMode,
};

use crate::decisions::StoredConfiguration;
use crate::lifecycle::SessionLifecycle;
use crate::merge::merge;
use crate::traits::{ConfigurationChangedHandler, ConfigurationSession, SetManyResult};

pub struct SessionCore {
    transport: Arc<dyn EngineTransport>,
    lifecycle: SessionLifecycle,
    state: RwLock<Arc<SessionState>>,
    handler: RwLock<Option<ConfigurationChangedHandler>>,
}

impl SessionCore {
    /// Core for `context` with no session established yet.
    pub fn new(transport: Arc<dyn EngineTransport>, context: SessionContext) -> Self {
        Self::with_state(transport, SessionState::new(context))
    }

    pub fn with_state(transport: Arc<dyn EngineTransport>, state: SessionState) -> Self {
        Self {
            lifecycle: SessionLifecycle::new(transport.clone()),
            transport,
            state: RwLock::new(Arc::new(state)),
            handler: RwLock::new(None),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> Arc<SessionState> {
        self.state.read().clone()
    }

    /// Establish a fresh session immediately instead of on first use.
    pub async fn connect(&self) -> Result<()> {
        let state = self.state();
        let next = self.lifecycle.recreate(&state).await?;
        self.swap(next);
        Ok(())
    }

    /// Replace the snapshot, then notify the observer if the configuration
    /// changed.
    fn swap(&self, next: SessionState) {
        let next = Arc::new(next);
        let changed = {
            let mut state = self.state.write();
            let changed = !Arc::ptr_eq(&state.configuration, &next.configuration);
            *state = next.clone();
            changed
        };

        if changed {
            let handler = self.handler.read().clone();
            if let Some(handler) = handler {
                handler(next.configuration.clone());
            }
        }
    }

    fn update(&self, f: impl FnOnce(SessionState) -> SessionState) {
        let state = self.state();
        self.swap(f((*state).clone()));
    }

    /// Live session id and the snapshot it belongs to, establishing a
    /// session first if none is held.
    async fn ensure_session(&self) -> Result<(SessionId, Arc<SessionState>)> {
        let state = self.state();
        if let Some(session_id) = &state.session_id {
            return Ok((session_id.clone(), state));
        }

        debug!("No live session, reinitializing");
        let next = self.lifecycle.reinitialize(&state).await?;
        let Some(session_id) = next.session_id.clone() else {
            return Err(Failure::InitializationFailure {
                message: "session was not established".to_string(),
            });
        };
        self.swap(next);
        Ok((session_id, self.state()))
    }

    async fn explain_inner(&self, question: &ExplainQuestion) -> Result<ExplainAnswer> {
        let (session_id, state) = self.ensure_session().await?;
        let answer = self.transport.explain(&session_id, question).await?;
        self.swap((*state).clone().with_solutions(answer.solutions()));
        Ok(answer)
    }
}

#[async_trait]
impl ConfigurationSession for SessionCore {
    fn configuration(&self) -> Arc<Configuration> {
        self.state.read().configuration.clone()
    }

    fn session_context(&self) -> SessionContext {
        self.state.read().context.clone()
    }

    fn session_id(&self) -> Option<SessionId> {
        self.state.read().session_id.clone()
    }

    fn solutions(&self) -> Vec<ExplainSolution> {
        self.state.read().solutions.clone()
    }

    fn set_on_configuration_changed_handler(&self, handler: Option<ConfigurationChangedHandler>) {
        *self.handler.write() = handler;
    }

    fn invalidate_session_id(&self) {
        let mut state = self.state.write();
        if let Some(session_id) = &state.session_id {
            debug!(session_id = %session_id, "Invalidating session id");
            *state = Arc::new((**state).clone().with_session_id(None));
        }
    }

    async fn make_decision(&self, decision: &AttributeDecision) -> Result<()> {
        let (session_id, state) = self.ensure_session().await?;
        debug!(attribute = %decision.attribute_id(), "Making decision");

        let response = self.transport.decide(&session_id, decision).await?;
        let configuration = merge(
            &state.configuration,
            &response.consequences,
            &response.affected_decisions,
        );
        self.swap(
            (*state)
                .clone()
                .with_configuration(configuration)
                .with_solutions(Vec::new()),
        );
        Ok(())
    }

    async fn set_many(
        &self,
        decisions: &[AttributeDecision],
        mode: &SetManyMode,
    ) -> Result<SetManyResult> {
        let (session_id, state) = self.ensure_session().await?;
        debug!(count = decisions.len(), "Setting decisions");

        match self.transport.set_many(&session_id, decisions, mode).await? {
            SetManyOutcome::Applied(response) => {
                let configuration = merge(
                    &state.configuration,
                    &response.consequences,
                    &response.affected_decisions,
                );
                self.swap(
                    (*state)
                        .clone()
                        .with_configuration(configuration)
                        .with_solutions(Vec::new()),
                );

                // Left non-fatal: the rest of the batch is already applied.
                if !response.rejected_decisions.is_empty() {
                    warn!(
                        rejected = response.rejected_decisions.len(),
                        "Engine rejected some decisions"
                    );
                }
                Ok(SetManyResult {
                    rejected_decisions: response.rejected_decisions,
                })
            }
            SetManyOutcome::Conflict(answer) => {
                debug!(
                    solutions = answer.decision_explanations.len(),
                    "Decisions conflict, nothing applied"
                );
                self.swap((*state).clone().with_solutions(answer.solutions()));
                Err(Failure::SetManyConflict {
                    constraint_explanations: answer.constraint_explanations,
                    decision_explanations: answer.decision_explanations,
                })
            }
        }
    }

    async fn apply_solution(&self, solution: &ExplainSolution) -> Result<SetManyResult> {
        if !self.state().solutions.contains(solution) {
            return Err(Failure::SolutionNotAvailable);
        }
        self.set_many(&solution.decisions, &solution.mode).await
    }

    async fn explain(&self, question: &ExplainQuestion) -> Result<ExplainAnswer> {
        match self.explain_inner(question).await {
            Ok(answer) => Ok(answer),
            Err(failure) => {
                self.update(|state| state.with_solutions(Vec::new()));
                Err(failure)
            }
        }
    }

    async fn set_session_context(&self, context: &SessionContext) -> Result<()> {
        let state = self.state();
        if state.context == *context {
            return Ok(());
        }

        // The old session belongs to the old context.
        if state.has_session() {
            self.lifecycle.close_quietly(state.session_id.as_ref()).await;
            self.invalidate_session_id();
        }

        let pending = (*self.state()).clone().with_context(context.clone());
        let next = self.lifecycle.reinitialize(&pending).await?;
        info!(session_id = ?next.session_id, "Session context switched");
        self.swap(next.with_solutions(Vec::new()));
        Ok(())
    }

    async fn restore_configuration(&self, stored: &StoredConfiguration) -> Result<()> {
        if !stored.is_supported() {
            return Err(Failure::InitializationFailure {
                message: format!(
                    "unsupported stored configuration version {}",
                    stored.schema_version
                ),
            });
        }

        let state = self.state();
        match self
            .lifecycle
            .restore(&state, &stored.explicit_decisions)
            .await
        {
            Ok(next) => {
                self.swap(next.with_solutions(Vec::new()));
                Ok(())
            }
            Err(failure) => {
                // The prior session may already be closed.
                self.invalidate_session_id();
                Err(failure)
            }
        }
    }

    async fn close(&self) -> Result<()> {
        let state = self.state();
        self.lifecycle.close(state.session_id.as_ref()).await?;
        if state.has_session() {
            self.swap(
                (*state)
                    .clone()
                    .with_session_id(None)
                    .with_solutions(Vec::new()),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use configurator_core::delta::BooleanDecisionDelta;
    use configurator_core::{
        AttributeId, Decision, DecisionResponse, DecisionsDelta, ExplainAnswerType,
        ExplainSubject,
    };

    use crate::testing::fixtures::*;
    use crate::testing::MockTransport;

    fn core(transport: &Arc<MockTransport>) -> SessionCore {
        SessionCore::new(transport.clone(), context("Car"))
    }

    fn why_not_satisfied() -> ExplainQuestion {
        ExplainQuestion::WhyIsNotSatisfied {
            subject: ExplainSubject::Configuration,
            answer_type: ExplainAnswerType::All,
        }
    }

    async fn core_with_solutions(transport: &Arc<MockTransport>) -> SessionCore {
        let core = core(transport);
        transport.push_explain_result(Ok(conflict_answer()));
        core.explain(&why_not_satisfied()).await.unwrap();
        assert_eq!(core.solutions().len(), 1);
        core
    }

    #[tokio::test]
    async fn test_first_operation_establishes_session() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = core(&transport);
        assert!(core.session_id().is_none());

        core.make_decision(&boolean_decision("A", true)).await.unwrap();
        assert_eq!(transport.create_calls(), 1);
        assert_eq!(core.session_id(), Some(SessionId::new("session-1")));
    }

    #[tokio::test]
    async fn test_make_decision_merges_response() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        transport.push_decide_result(Ok(DecisionResponse {
            affected_decisions: DecisionsDelta {
                boolean: vec![BooleanDecisionDelta {
                    attribute_id: AttributeId::new("A"),
                    decision: Some(Decision::explicit(true)),
                }],
                ..Default::default()
            },
            ..Default::default()
        }));
        let core = core(&transport);

        core.make_decision(&boolean_decision("A", true)).await.unwrap();
        let configuration = core.configuration();
        match configuration.attribute(&AttributeId::new("A")) {
            Some(configurator_core::Attribute::Boolean(a)) => {
                assert_eq!(a.decision, Some(Decision::explicit(true)))
            }
            other => panic!("unexpected attribute {:?}", other),
        }
        assert_eq!(configuration.len(), 2);
    }

    #[tokio::test]
    async fn test_successful_decision_clears_solutions() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = core_with_solutions(&transport).await;

        core.make_decision(&boolean_decision("A", false)).await.unwrap();
        assert!(core.solutions().is_empty());
    }

    #[tokio::test]
    async fn test_set_many_conflict_keeps_configuration() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = core(&transport);
        core.make_decision(&boolean_decision("A", true)).await.unwrap();
        let before = core.configuration();

        transport.push_set_many_result(Ok(SetManyOutcome::Conflict(conflict_answer())));
        let err = core
            .set_many(&[boolean_decision("B", true)], &SetManyMode::KeepExistingDecisions)
            .await
            .unwrap_err();

        assert!(matches!(err, Failure::SetManyConflict { .. }));
        assert!(Arc::ptr_eq(&before, &core.configuration()));
        assert_eq!(core.solutions(), conflict_answer().solutions());
    }

    #[tokio::test]
    async fn test_set_many_reports_rejected_decisions() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let rejected = vec![boolean_decision("B", true)];
        transport.push_set_many_result(Ok(SetManyOutcome::Applied(
            configurator_core::SetManyResponse {
                rejected_decisions: rejected.clone(),
                ..Default::default()
            },
        )));
        let core = core_with_solutions(&transport).await;

        let result = core
            .set_many(&rejected, &SetManyMode::KeepExistingDecisions)
            .await
            .unwrap();
        assert_eq!(result.rejected_decisions, rejected);
        assert!(core.solutions().is_empty());
    }

    #[tokio::test]
    async fn test_apply_absent_solution_makes_no_call() {
        let transport = Arc::new(MockTransport::new());
        let core = core(&transport);

        let err = core
            .apply_solution(&conflict_answer().solutions()[0])
            .await
            .unwrap_err();
        assert_eq!(err, Failure::SolutionNotAvailable);
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_apply_cached_solution_issues_set_many() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = core_with_solutions(&transport).await;
        let solution = core.solutions()[0].clone();

        core.apply_solution(&solution).await.unwrap();
        let requests = transport.set_many_requests();
        let (decisions, mode) = requests.last().unwrap();
        assert_eq!(decisions, &solution.decisions);
        assert_eq!(mode, &solution.mode);
        assert!(core.solutions().is_empty());
    }

    #[tokio::test]
    async fn test_explain_failure_clears_solutions() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = core_with_solutions(&transport).await;

        transport.push_explain_result(Err(Failure::ExplainFailure {
            message: "no".into(),
        }));
        assert!(core.explain(&why_not_satisfied()).await.is_err());
        assert!(core.solutions().is_empty());
    }

    #[tokio::test]
    async fn test_same_context_is_noop() {
        let transport = Arc::new(MockTransport::new());
        let core = core(&transport);
        core.set_session_context(&context("Car")).await.unwrap();
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_context_switch_replays_explicit_decisions() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = SessionCore::with_state(
            transport.clone(),
            configurator_core::SessionState::new(context("Car"))
                .with_session_id(Some(SessionId::new("old")))
                .with_configuration(configuration(
                    true,
                    vec![boolean("A", Some(Decision::explicit(true)))],
                )),
        );

        core.set_session_context(&context("Truck")).await.unwrap();
        assert_eq!(transport.close_calls(), 1);
        assert_eq!(transport.created_contexts(), vec![context("Truck")]);
        assert_eq!(transport.set_many_requests()[0].0, vec![boolean_decision("A", true)]);
        assert_eq!(core.session_context(), context("Truck"));
        assert_eq!(core.session_id(), Some(SessionId::new("session-1")));
    }

    #[tokio::test]
    async fn test_restore_configuration() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = core(&transport);
        let stored = StoredConfiguration::new(vec![boolean_decision("A", true)]);

        core.restore_configuration(&stored).await.unwrap();
        assert_eq!(transport.set_many_requests()[0].0, stored.explicit_decisions);
        assert!(core.session_id().is_some());
    }

    #[tokio::test]
    async fn test_close_without_session() {
        let transport = Arc::new(MockTransport::new());
        let core = core(&transport);
        core.close().await.unwrap();
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_close_forgets_session() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = core(&transport);
        core.connect().await.unwrap();
        assert!(core.session_id().is_some());

        core.close().await.unwrap();
        assert!(core.session_id().is_none());
        assert_eq!(transport.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_session_id_is_local() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = core(&transport);
        core.connect().await.unwrap();
        let calls = transport.total_calls();

        core.invalidate_session_id();
        assert!(core.session_id().is_none());
        assert_eq!(transport.total_calls(), calls);
    }

    #[tokio::test]
    async fn test_observer_notified_after_swap() {
        let transport = Arc::new(MockTransport::new().with_server_state(server_state()));
        let core = Arc::new(core(&transport));
        let notified = Arc::new(AtomicUsize::new(0));

        let observed = notified.clone();
        let weak = Arc::downgrade(&core);
        core.set_on_configuration_changed_handler(Some(Arc::new(move |configuration| {
            // The snapshot must already hold the configuration being reported.
            let core = weak.upgrade().unwrap();
            assert!(Arc::ptr_eq(&core.configuration(), &configuration));
            observed.fetch_add(1, Ordering::SeqCst);
        })));

        core.make_decision(&boolean_decision("A", true)).await.unwrap();
        // Session establishment and the decision each replace the configuration.
        assert_eq!(notified.load(Ordering::SeqCst), 2);

        transport.push_set_many_result(Ok(SetManyOutcome::Conflict(conflict_answer())));
        let _ = core
            .set_many(&[boolean_decision("B", true)], &SetManyMode::KeepExistingDecisions)
            .await;
        assert_eq!(notified.load(Ordering::SeqCst), 2);

        core.set_on_configuration_changed_handler(None);
        core.make_decision(&boolean_decision("A", false)).await.unwrap();
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }
}
