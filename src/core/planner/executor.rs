use super::store::{PlanSlot, PlanStore};
use super::types::{PlanStatus, StepStatus};
use crate::core::capabilities::CapabilityRegistry;
use crate::core::dispatch::{DispatchGateway, DispatchRequest, RetryPolicy, dispatch_with_retry};
use crate::error::PlannerError;
use crate::runtime::observability::{NoopObserver, Observer, ObserverEvent, ObserverMetric};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Key under which a compensation call receives the forward step's result.
pub const ORIGINAL_RESULT_KEY: &str = "original_result";

const ABANDONED_STEP_ERROR: &str = "execution stopped before the step reported an outcome";

enum NextStep {
    Done,
    AlreadySucceeded,
    Cancelled,
    Dispatch {
        step_id: String,
        request: DispatchRequest,
    },
}

enum ForwardOutcome {
    Finished,
    StepFailed,
    Cancelled,
}

struct Compensable {
    index: usize,
    step_id: String,
    worker: String,
    action: String,
    parameters: BTreeMap<String, Value>,
    result: Option<Value>,
}

/// Drives stored plans step by step, compensating in reverse on failure.
pub struct SagaExecutor {
    store: Arc<PlanStore>,
    registry: Arc<CapabilityRegistry>,
    gateway: Arc<dyn DispatchGateway>,
    policy: RetryPolicy,
    observer: Arc<dyn Observer>,
}

impl SagaExecutor {
    pub fn new(
        store: Arc<PlanStore>,
        registry: Arc<CapabilityRegistry>,
        gateway: Arc<dyn DispatchGateway>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            registry,
            gateway,
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Run a `pending` or `failed` plan to a terminal status.
    ///
    /// If another call already holds the plan, returns the plan's current
    /// status without touching it. A `completed` plan is returned as-is, and a
    /// plan left `running` by a dropped run is settled as failed.
    pub async fn execute(&self, plan_id: &str) -> Result<PlanStatus, PlannerError> {
        let slot = self.slot(plan_id)?;
        if slot.snapshot().status == PlanStatus::Completed {
            return Ok(PlanStatus::Completed);
        }

        let Ok(_guard) = slot.execution_lock().try_lock() else {
            let current = slot.snapshot().status;
            tracing::debug!(
                plan_id,
                status = %current,
                "Plan already executing, returning current status"
            );
            return Ok(current);
        };

        match slot.update(|plan| plan.status) {
            PlanStatus::Completed => return Ok(PlanStatus::Completed),
            PlanStatus::Pending => {}
            PlanStatus::Failed => {
                tracing::info!(plan_id, "Retrying failed plan");
                slot.update(|plan| plan.reset_unsucceeded_steps());
            }
            status @ (PlanStatus::Running | PlanStatus::Compensating) => {
                // Nobody else holds the lock, so the run that set this status
                // was dropped before reaching a terminal state.
                return self.recover_abandoned(&slot, plan_id, status).await;
            }
        }

        self.transition(&slot, PlanStatus::Running)?;

        let outcome = self.run_forward(&slot, plan_id).await;
        if matches!(outcome, ForwardOutcome::Finished) && slot.update(|plan| plan.all_succeeded()) {
            self.transition(&slot, PlanStatus::Completed)?;
            tracing::info!(plan_id, "Plan completed");
            return Ok(PlanStatus::Completed);
        }

        if matches!(outcome, ForwardOutcome::Cancelled) {
            tracing::info!(plan_id, "Plan cancelled, compensating");
        }
        self.transition(&slot, PlanStatus::Compensating)?;
        self.compensate(&slot, plan_id).await;
        self.transition(&slot, PlanStatus::Failed)?;
        tracing::warn!(plan_id, "Plan failed");
        Ok(PlanStatus::Failed)
    }

    /// Settle a plan whose previous run stopped mid-flight. The step that was
    /// in the air has an unknown outcome and is marked failed, then completed
    /// steps are compensated as after any other failure.
    async fn recover_abandoned(
        &self,
        slot: &PlanSlot,
        plan_id: &str,
        status: PlanStatus,
    ) -> Result<PlanStatus, PlannerError> {
        tracing::warn!(plan_id, status = %status, "Recovering abandoned plan execution");
        slot.update(|plan| {
            for step in &mut plan.steps {
                if step.status == StepStatus::Dispatched {
                    step.status = StepStatus::Failed;
                    step.error = Some(ABANDONED_STEP_ERROR.to_string());
                }
            }
            plan.touch();
        });
        if status == PlanStatus::Running {
            self.transition(slot, PlanStatus::Compensating)?;
        }
        self.compensate(slot, plan_id).await;
        self.transition(slot, PlanStatus::Failed)?;
        Ok(PlanStatus::Failed)
    }

    /// Schedule [`Self::execute`] on the runtime and return immediately.
    ///
    /// The run is owned by the runtime, so dropping the handle does not stop it.
    pub fn spawn_execute(
        self: &Arc<Self>,
        plan_id: &str,
    ) -> Result<JoinHandle<Result<PlanStatus, PlannerError>>, PlannerError> {
        self.slot(plan_id)?;
        let executor = Arc::clone(self);
        let plan_id = plan_id.to_string();
        Ok(tokio::spawn(async move {
            let result = executor.execute(&plan_id).await;
            if let Err(error) = &result {
                tracing::error!(plan_id = plan_id.as_str(), "Background execution failed: {error}");
                executor.observer.record_event(&ObserverEvent::Error {
                    component: "saga_executor".into(),
                    message: format!("plan {plan_id}: {error}"),
                });
            }
            result
        }))
    }

    /// Request cancellation.
    ///
    /// A running plan stops before its next step; the in-flight dispatch is
    /// never preempted. An idle pending plan is failed right away without any
    /// forward dispatch, as is a plan whose run was dropped mid-flight.
    pub async fn cancel(&self, plan_id: &str) -> Result<PlanStatus, PlannerError> {
        let slot = self.slot(plan_id)?;
        let status = slot.update(|plan| match plan.status {
            PlanStatus::Completed => Err(PlannerError::PlanNotCancellable(plan.id.clone())),
            PlanStatus::Failed => Ok(PlanStatus::Failed),
            status => {
                plan.cancel_requested = true;
                plan.touch();
                Ok(status)
            }
        })?;

        tracing::info!(plan_id, status = %status, "Cancellation requested");
        if status == PlanStatus::Pending {
            return self.execute(plan_id).await;
        }
        if let Ok(_guard) = slot.execution_lock().try_lock() {
            return match slot.snapshot().status {
                current @ (PlanStatus::Running | PlanStatus::Compensating) => {
                    self.recover_abandoned(&slot, plan_id, current).await
                }
                current => Ok(current),
            };
        }
        Ok(status)
    }

    fn slot(&self, plan_id: &str) -> Result<Arc<PlanSlot>, PlannerError> {
        self.store
            .slot(plan_id)
            .ok_or_else(|| PlannerError::PlanNotFound(plan_id.to_string()))
    }

    fn transition(&self, slot: &PlanSlot, target: PlanStatus) -> Result<(), PlannerError> {
        let (plan_id, from) = slot.update(|plan| {
            let from = plan.status;
            plan.transition(target).map(|()| (plan.id.clone(), from))
        })?;
        self.observer.record_event(&ObserverEvent::PlanTransition {
            plan_id,
            from,
            to: target,
        });
        Ok(())
    }

    async fn run_forward(&self, slot: &PlanSlot, plan_id: &str) -> ForwardOutcome {
        let mut index = 0;
        loop {
            let next = slot.update(|plan| {
                let cancel_requested = plan.cancel_requested;
                let Some(step) = plan.steps.get_mut(index) else {
                    return NextStep::Done;
                };
                if step.status != StepStatus::Pending {
                    return NextStep::AlreadySucceeded;
                }
                if cancel_requested {
                    return NextStep::Cancelled;
                }
                step.status = StepStatus::Dispatched;
                let next = NextStep::Dispatch {
                    step_id: step.id.clone(),
                    request: DispatchRequest::new(&step.target_worker, &step.action)
                        .with_parameters(step.parameters.clone()),
                };
                plan.touch();
                next
            });

            let (step_id, request) = match next {
                NextStep::Done => return ForwardOutcome::Finished,
                NextStep::Cancelled => return ForwardOutcome::Cancelled,
                NextStep::AlreadySucceeded => {
                    index += 1;
                    continue;
                }
                NextStep::Dispatch { step_id, request } => (step_id, request),
            };

            let started = Instant::now();
            let outcome = dispatch_with_retry(self.gateway.as_ref(), &request, &self.policy).await;
            self.observer.record_metric(&ObserverMetric::DispatchLatency {
                action: request.action.clone(),
                duration: started.elapsed(),
            });

            let status = slot.update(|plan| {
                let step = &mut plan.steps[index];
                step.attempts = outcome.attempts;
                match outcome.result {
                    Ok(value) => {
                        step.status = StepStatus::Succeeded;
                        step.result = Some(value);
                        step.error = None;
                    }
                    Err(error) => {
                        step.status = StepStatus::Failed;
                        step.error = Some(error.to_string());
                    }
                }
                let status = step.status;
                plan.touch();
                status
            });

            self.observer.record_event(&ObserverEvent::StepDispatched {
                plan_id: plan_id.to_string(),
                step_id,
                action: request.action,
                worker: request.worker_id,
                attempts: outcome.attempts,
                status,
            });

            if status == StepStatus::Failed {
                return ForwardOutcome::StepFailed;
            }
            index += 1;
        }
    }

    async fn compensate(&self, slot: &PlanSlot, plan_id: &str) {
        let completed: Vec<Compensable> = slot.update(|plan| {
            plan.steps
                .iter()
                .enumerate()
                .rev()
                .filter(|(_, step)| step.status == StepStatus::Succeeded)
                .map(|(index, step)| Compensable {
                    index,
                    step_id: step.id.clone(),
                    worker: step.target_worker.clone(),
                    action: step.action.clone(),
                    parameters: step.parameters.clone(),
                    result: step.result.clone(),
                })
                .collect()
        });

        let policy = self.policy.single_retry();
        for step in completed {
            let compensation = self
                .registry
                .compensation_for(&step.worker, &step.action)
                .map(ToOwned::to_owned);

            let Some(compensation) = compensation else {
                slot.update(|plan| {
                    plan.steps[step.index].status = StepStatus::Skipped;
                    plan.touch();
                });
                self.observer.record_event(&ObserverEvent::StepCompensated {
                    plan_id: plan_id.to_string(),
                    step_id: step.step_id,
                    compensation: None,
                    error: None,
                });
                continue;
            };

            let mut parameters = step.parameters;
            parameters.insert(
                ORIGINAL_RESULT_KEY.to_string(),
                step.result.unwrap_or(Value::Null),
            );
            let request =
                DispatchRequest::new(&step.worker, &compensation).with_parameters(parameters);
            let outcome = dispatch_with_retry(self.gateway.as_ref(), &request, &policy).await;

            let error = outcome.result.err().map(|error| {
                tracing::warn!(
                    plan_id,
                    step_id = step.step_id.as_str(),
                    compensation = compensation.as_str(),
                    "Compensation failed: {error}"
                );
                format!("compensation {compensation} failed: {error}")
            });

            slot.update(|plan| {
                let target = &mut plan.steps[step.index];
                target.status = StepStatus::Compensated;
                if let Some(error) = &error {
                    target.error = Some(error.clone());
                }
                plan.touch();
            });
            self.observer.record_event(&ObserverEvent::StepCompensated {
                plan_id: plan_id.to_string(),
                step_id: step.step_id,
                compensation: Some(compensation),
                error,
            });
        }

        slot.update(|plan| {
            for step in &mut plan.steps {
                if step.status == StepStatus::Pending {
                    step.status = StepStatus::Skipped;
                }
            }
            plan.touch();
        });
    }
}
