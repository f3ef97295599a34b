//! Coalescing of superseded context switches.
//!
//! An interactive caller can request many context switches in quick
//! succession. Only the newest one matters, so requests that arrive while a
//! switch is executing are merged into a single pending request instead of
//! queuing up.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use configurator_core::{
    AttributeDecision, Configuration, ExplainAnswer, ExplainQuestion, ExplainSolution, Failure,
    Result, SessionContext, SessionId, SetManyMode,
};

use crate::decisions::StoredConfiguration;
use crate::exclusive::ExclusiveScope;
use crate::traits::{ConfigurationChangedHandler, ConfigurationSession, SetManyResult};

/// Executes one set of parameters.
pub type Runner<P, R> = Arc<dyn Fn(P) -> BoxFuture<'static, R> + Send + Sync>;

/// Merges waiting parameters (first) with newly pushed ones (second).
pub type Reducer<P> = Arc<dyn Fn(P, P) -> P + Send + Sync>;

type SharedOutcome<R> = Shared<BoxFuture<'static, Option<R>>>;

struct Pending<P, R> {
    params: P,
    sender: oneshot::Sender<R>,
    outcome: SharedOutcome<R>,
}

struct Executing<P, R> {
    params: P,
    outcome: SharedOutcome<R>,
}

struct Slot<P, R> {
    running: bool,
    pending: Option<Pending<P, R>>,
    executing: Option<Executing<P, R>>,
}

/// Single-slot queue that merges parameters pushed while busy.
///
/// At most one execution runs and at most one waits. A push while idle
/// starts an execution right away; a push while busy is merged into the
/// waiting parameters with the reducer. Every pusher receives the outcome
/// of the first execution that starts after its push.
pub struct ReducingQueue<P, R> {
    slot: Arc<Mutex<Slot<P, R>>>,
    runner: Runner<P, R>,
    reducer: Reducer<P>,
}

impl<P, R> ReducingQueue<P, R>
where
    P: Clone + Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub fn new(runner: Runner<P, R>, reducer: Reducer<P>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                running: false,
                pending: None,
                executing: None,
            })),
            runner,
            reducer,
        }
    }

    /// Queue where a newer push replaces the waiting parameters.
    pub fn last_write_wins(runner: Runner<P, R>) -> Self {
        Self::new(runner, Arc::new(|_older, newer| newer))
    }

    /// Push parameters and wait for the execution that covers them.
    ///
    /// Returns `None` only if that execution was abandoned without an outcome.
    pub async fn push(&self, params: P) -> Option<R> {
        let (outcome, start) = {
            let mut slot = self.slot.lock();
            self.enqueue(&mut slot, params)
        };
        self.await_outcome(outcome, start).await
    }

    /// Merge `params` into the waiting entry, or create one.
    ///
    /// The flag tells whether the caller must start a drain.
    fn enqueue(&self, slot: &mut Slot<P, R>, params: P) -> (SharedOutcome<R>, bool) {
        let outcome = match slot.pending.take() {
            Some(pending) => {
                let outcome = pending.outcome.clone();
                slot.pending = Some(Pending {
                    params: (self.reducer)(pending.params, params),
                    sender: pending.sender,
                    outcome: pending.outcome,
                });
                outcome
            }
            None => {
                let (sender, receiver) = oneshot::channel();
                let outcome = receiver.map(|r| r.ok()).boxed().shared();
                slot.pending = Some(Pending {
                    params,
                    sender,
                    outcome: outcome.clone(),
                });
                outcome
            }
        };

        let start = !slot.running;
        slot.running = true;
        (outcome, start)
    }

    async fn await_outcome(&self, outcome: SharedOutcome<R>, start: bool) -> Option<R> {
        if start {
            // Detached so that a caller dropping its future never abandons an
            // execution other callers wait on.
            tokio::spawn(Self::drain(self.slot.clone(), self.runner.clone()));
        }
        outcome.await
    }

    async fn drain(slot: Arc<Mutex<Slot<P, R>>>, runner: Runner<P, R>) {
        loop {
            let next = {
                let mut slot = slot.lock();
                match slot.pending.take() {
                    Some(pending) => {
                        slot.executing = Some(Executing {
                            params: pending.params.clone(),
                            outcome: pending.outcome.clone(),
                        });
                        pending
                    }
                    None => {
                        slot.running = false;
                        slot.executing = None;
                        return;
                    }
                }
            };

            let params = next.params;
            match AssertUnwindSafe(async { runner(params).await })
                .catch_unwind()
                .await
            {
                // Every waiter may have gone away.
                Ok(outcome) => {
                    let _ = next.sender.send(outcome);
                }
                // Dropping the sender resolves the waiters with `None`.
                Err(_) => warn!("Queued execution panicked, its callers get no outcome"),
            }
        }
    }
}

impl<P, R> ReducingQueue<P, R>
where
    P: Clone + PartialEq + Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Push `params` unless they are already the newest request.
    ///
    /// Parameters equal to the waiting ones, or to the executing ones while
    /// nothing waits, join that execution. While the queue is idle `settled`
    /// may answer directly for parameters that need no execution at all.
    pub async fn push_distinct(
        &self,
        params: P,
        settled: impl FnOnce(&P) -> Option<R>,
    ) -> Option<R> {
        let (outcome, start) = {
            let mut slot = self.slot.lock();
            let joined = match (&slot.pending, &slot.executing) {
                (Some(pending), _) if pending.params == params => Some(pending.outcome.clone()),
                (None, Some(executing)) if executing.params == params => {
                    Some(executing.outcome.clone())
                }
                _ => None,
            };

            match joined {
                Some(outcome) => (outcome, false),
                None => {
                    if !slot.running {
                        if let Some(result) = settled(&params) {
                            return Some(result);
                        }
                    }
                    self.enqueue(&mut slot, params)
                }
            }
        };
        self.await_outcome(outcome, start).await
    }
}

/// Coalesces concurrent context switches of the wrapped session.
///
/// Every other operation is forwarded unchanged.
pub struct CoalescingSession {
    inner: Arc<dyn ConfigurationSession>,
    queue: ReducingQueue<SessionContext, Result<()>>,
}

impl CoalescingSession {
    /// Each executed switch enters `scope`, serializing it with the
    /// mutating operations guarded by the same scope.
    pub fn new(inner: Arc<dyn ConfigurationSession>, scope: ExclusiveScope) -> Self {
        let runner_inner = inner.clone();
        let runner: Runner<SessionContext, Result<()>> = Arc::new(move |context: SessionContext| {
            let inner = runner_inner.clone();
            let scope = scope.clone();
            async move {
                let _guard = scope.enter_owned("set_session_context").await;
                debug!(deployment = ?context.model_source.deployment_name(), "Switching session context");
                inner.set_session_context(&context).await
            }
            .boxed()
        });

        Self {
            inner,
            queue: ReducingQueue::last_write_wins(runner),
        }
    }
}

#[async_trait]
impl ConfigurationSession for CoalescingSession {
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
        self.inner.make_decision(decision).await
    }

    async fn set_many(
        &self,
        decisions: &[AttributeDecision],
        mode: &SetManyMode,
    ) -> Result<SetManyResult> {
        self.inner.set_many(decisions, mode).await
    }

    async fn apply_solution(&self, solution: &ExplainSolution) -> Result<SetManyResult> {
        self.inner.apply_solution(solution).await
    }

    async fn explain(&self, question: &ExplainQuestion) -> Result<ExplainAnswer> {
        self.inner.explain(question).await
    }

    async fn set_session_context(&self, context: &SessionContext) -> Result<()> {
        // Compared against the newest requested context, not the held one:
        // switching back while another switch is pending must still execute.
        let inner = &self.inner;
        self.queue
            .push_distinct(context.clone(), |context| {
                (inner.session_context() == *context).then(|| Ok(()))
            })
            .await
            .unwrap_or_else(|| Err(Failure::unknown("context switch was abandoned")))
    }

    async fn restore_configuration(&self, stored: &StoredConfiguration) -> Result<()> {
        self.inner.restore_configuration(stored).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
