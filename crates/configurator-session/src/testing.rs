//! Test doubles shared by the unit tests of this crate.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use configurator_client::{EngineTransport, SetManyOutcome};
use configurator_core::{
    AttributeDecision, ConsequencesDelta, DecisionResponse, DecisionsDelta, ExplainAnswer,
    ExplainQuestion, Result, SessionContext, SessionId, SetManyMode,
};

// ============================================================================
// Mock Transport
// ============================================================================

#[derive(Default)]
struct Counters {
    create: AtomicUsize,
    close: AtomicUsize,
    decide: AtomicUsize,
    set_many: AtomicUsize,
    get_decisions: AtomicUsize,
    get_consequences: AtomicUsize,
    explain: AtomicUsize,
}

/// Scripted in-memory engine.
///
/// Each operation pops its next scripted result and falls back to an empty
/// success. Every call is counted and, with a delay configured, sleeps while
/// being tracked as in flight.
#[derive(Default)]
pub struct MockTransport {
    counters: Counters,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    server_state: (DecisionsDelta, ConsequencesDelta),
    created_contexts: Mutex<Vec<SessionContext>>,
    set_many_requests: Mutex<Vec<(Vec<AttributeDecision>, SetManyMode)>>,
    close_results: Mutex<VecDeque<Result<()>>>,
    decide_results: Mutex<VecDeque<Result<DecisionResponse>>>,
    set_many_results: Mutex<VecDeque<Result<SetManyOutcome>>>,
    get_decisions_results: Mutex<VecDeque<Result<DecisionsDelta>>>,
    explain_results: Mutex<VecDeque<Result<ExplainAnswer>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// State reported by `get_decisions` / `get_consequences`.
    pub fn with_server_state(mut self, state: (DecisionsDelta, ConsequencesDelta)) -> Self {
        self.server_state = state;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_close_result(&self, result: Result<()>) {
        self.close_results.lock().push_back(result);
    }

    pub fn push_decide_result(&self, result: Result<DecisionResponse>) {
        self.decide_results.lock().push_back(result);
    }

    pub fn push_set_many_result(&self, result: Result<SetManyOutcome>) {
        self.set_many_results.lock().push_back(result);
    }

    pub fn push_get_decisions_result(&self, result: Result<DecisionsDelta>) {
        self.get_decisions_results.lock().push_back(result);
    }

    pub fn push_explain_result(&self, result: Result<ExplainAnswer>) {
        self.explain_results.lock().push_back(result);
    }

    pub fn create_calls(&self) -> usize {
        self.counters.create.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.counters.close.load(Ordering::SeqCst)
    }

    pub fn decide_calls(&self) -> usize {
        self.counters.decide.load(Ordering::SeqCst)
    }

    pub fn set_many_calls(&self) -> usize {
        self.counters.set_many.load(Ordering::SeqCst)
    }

    pub fn get_decisions_calls(&self) -> usize {
        self.counters.get_decisions.load(Ordering::SeqCst)
    }

    pub fn get_consequences_calls(&self) -> usize {
        self.counters.get_consequences.load(Ordering::SeqCst)
    }

    pub fn explain_calls(&self) -> usize {
        self.counters.explain.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.create_calls()
            + self.close_calls()
            + self.decide_calls()
            + self.set_many_calls()
            + self.get_decisions_calls()
            + self.get_consequences_calls()
            + self.explain_calls()
    }

    /// Calls currently between their start and their response.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reset_max_in_flight(&self) {
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    pub fn created_contexts(&self) -> Vec<SessionContext> {
        self.created_contexts.lock().clone()
    }

    pub fn set_many_requests(&self) -> Vec<(Vec<AttributeDecision>, SetManyMode)> {
        self.set_many_requests.lock().clone()
    }

    async fn call(&self, counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn next<T>(queue: &Mutex<VecDeque<Result<T>>>, fallback: impl FnOnce() -> T) -> Result<T> {
        queue.lock().pop_front().unwrap_or_else(|| Ok(fallback()))
    }
}

#[async_trait]
impl EngineTransport for MockTransport {
    async fn create_session(&self, context: &SessionContext) -> Result<SessionId> {
        self.call(&self.counters.create).await;
        let mut contexts = self.created_contexts.lock();
        contexts.push(context.clone());
        Ok(SessionId::new(format!("session-{}", contexts.len())))
    }

    async fn close_session(&self, _session_id: &SessionId) -> Result<()> {
        self.call(&self.counters.close).await;
        Self::next(&self.close_results, || ())
    }

    async fn decide(
        &self,
        _session_id: &SessionId,
        _decision: &AttributeDecision,
    ) -> Result<DecisionResponse> {
        self.call(&self.counters.decide).await;
        Self::next(&self.decide_results, DecisionResponse::default)
    }

    async fn set_many(
        &self,
        _session_id: &SessionId,
        decisions: &[AttributeDecision],
        mode: &SetManyMode,
    ) -> Result<SetManyOutcome> {
        self.call(&self.counters.set_many).await;
        self.set_many_requests.lock().push((decisions.to_vec(), *mode));
        Self::next(&self.set_many_results, || {
            SetManyOutcome::Applied(Default::default())
        })
    }

    async fn get_decisions(&self, _session_id: &SessionId) -> Result<DecisionsDelta> {
        self.call(&self.counters.get_decisions).await;
        Self::next(&self.get_decisions_results, || self.server_state.0.clone())
    }

    async fn get_consequences(&self, _session_id: &SessionId) -> Result<ConsequencesDelta> {
        self.call(&self.counters.get_consequences).await;
        Ok(self.server_state.1.clone())
    }

    async fn explain(
        &self,
        _session_id: &SessionId,
        _question: &ExplainQuestion,
    ) -> Result<ExplainAnswer> {
        self.call(&self.counters.explain).await;
        Self::next(&self.explain_results, ExplainAnswer::default)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub mod fixtures {
    use super::*;
    use configurator_core::delta::BooleanConsequence;
    use configurator_core::{
        Attribute, AttributeId, BooleanAttribute, Cardinality, ChoiceAttribute, ChoiceValue,
        ChoiceValueDecisionState, ComponentAttribute, ComponentDecisionState, Configuration,
        ConfigurationModelSource, Decision, DecisionExplanation, ExplainSolution,
        NumericAttribute, NumericRange,
    };

    pub fn boolean(id: &str, decision: Option<Decision<bool>>) -> Attribute {
        Attribute::Boolean(BooleanAttribute {
            id: AttributeId::new(id),
            is_satisfied: true,
            can_contribute_to_configuration_satisfaction: true,
            possible_decision_states: vec![true, false],
            decision,
        })
    }

    pub fn numeric(id: &str, decision: Option<Decision<f64>>) -> Attribute {
        Attribute::Numeric(NumericAttribute {
            id: AttributeId::new(id),
            is_satisfied: true,
            can_contribute_to_configuration_satisfaction: true,
            range: NumericRange {
                min: 0.0,
                max: 10.0,
            },
            decimal_places: 1,
            decision,
        })
    }

    pub fn choice(
        id: &str,
        values: &[(&str, Option<Decision<ChoiceValueDecisionState>>)],
    ) -> Attribute {
        let values: BTreeMap<String, ChoiceValue> = values
            .iter()
            .map(|(value_id, decision)| {
                (
                    value_id.to_string(),
                    ChoiceValue {
                        id: value_id.to_string(),
                        possible_decision_states: vec![
                            ChoiceValueDecisionState::Included,
                            ChoiceValueDecisionState::Excluded,
                        ],
                        decision: *decision,
                    },
                )
            })
            .collect();

        Attribute::Choice(ChoiceAttribute {
            id: AttributeId::new(id),
            is_satisfied: true,
            can_contribute_to_configuration_satisfaction: true,
            cardinality: Cardinality {
                lower_bound: 1,
                upper_bound: 1,
            },
            values,
        })
    }

    pub fn component(id: &str, decision: Option<Decision<ComponentDecisionState>>) -> Attribute {
        Attribute::Component(ComponentAttribute {
            id: AttributeId::new(id),
            is_satisfied: true,
            can_contribute_to_configuration_satisfaction: false,
            possible_decision_states: vec![
                ComponentDecisionState::Included,
                ComponentDecisionState::Excluded,
            ],
            decision,
        })
    }

    pub fn configuration(is_satisfied: bool, attributes: Vec<Attribute>) -> Configuration {
        Configuration {
            is_satisfied,
            attributes: attributes
                .into_iter()
                .map(|a| (a.id().clone(), a))
                .collect(),
        }
    }

    pub fn context(deployment: &str) -> SessionContext {
        SessionContext::new(ConfigurationModelSource::channel(deployment, "release"))
    }

    pub fn boolean_decision(id: &str, state: bool) -> AttributeDecision {
        AttributeDecision::Boolean {
            attribute_id: AttributeId::new(id),
            state: Some(state),
        }
    }

    /// Server-side state with two undecided boolean attributes, A and B.
    pub fn server_state() -> (DecisionsDelta, ConsequencesDelta) {
        let consequence = |id: &str| BooleanConsequence {
            attribute_id: AttributeId::new(id),
            is_satisfied: true,
            can_contribute_to_configuration_satisfaction: true,
            possible_decision_states: vec![true, false],
        };
        (
            DecisionsDelta::default(),
            ConsequencesDelta {
                is_configuration_satisfied: Some(false),
                boolean: vec![consequence("A"), consequence("B")],
                ..Default::default()
            },
        )
    }

    /// Conflict answer proposing a single solution.
    pub fn conflict_answer() -> ExplainAnswer {
        ExplainAnswer {
            constraint_explanations: vec![],
            decision_explanations: vec![DecisionExplanation {
                caused_by_decisions: vec![boolean_decision("A", true)],
                solution: Some(ExplainSolution {
                    decisions: vec![boolean_decision("B", false)],
                    mode: SetManyMode::drop_existing_automatic(),
                }),
            }],
        }
    }
}
