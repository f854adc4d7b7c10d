use super::traits::{Observer, ObserverEvent, ObserverMetric};
use tracing::{info, warn};

/// Emits every event and metric as a structured `tracing` record
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::PlanTransition { plan_id, from, to } => {
                info!(plan_id = %plan_id, from = %from, to = %to, "plan.transition");
            }
            ObserverEvent::StepDispatched {
                plan_id,
                step_id,
                action,
                worker,
                attempts,
                status,
            } => {
                info!(
                    plan_id = %plan_id,
                    step_id = %step_id,
                    action = %action,
                    worker = %worker,
                    attempts = attempts,
                    status = %status,
                    "step.dispatched"
                );
            }
            ObserverEvent::StepCompensated {
                plan_id,
                step_id,
                compensation,
                error,
            } => {
                info!(
                    plan_id = %plan_id,
                    step_id = %step_id,
                    compensation = ?compensation,
                    error = ?error,
                    "step.compensated"
                );
            }
            ObserverEvent::HealthUpdated { service, status } => {
                info!(service = %service, status = %status, "health.updated");
            }
            ObserverEvent::RemediationQueued {
                service,
                task_id,
                action,
            } => {
                info!(service = %service, task_id = %task_id, action = %action, "remediation.queued");
            }
            ObserverEvent::RemediationStarted { service, task_id } => {
                info!(service = %service, task_id = %task_id, "remediation.started");
            }
            ObserverEvent::RemediationSucceeded { service, task_id } => {
                info!(service = %service, task_id = %task_id, "remediation.succeeded");
            }
            ObserverEvent::RemediationFailed {
                service,
                task_id,
                error,
            } => {
                warn!(service = %service, task_id = %task_id, error = %error, "remediation.failed");
            }
            ObserverEvent::Error { component, message } => {
                warn!(component = %component, error = %message, "error");
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::DispatchLatency { action, duration } => {
                let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                info!(action = %action, latency_ms = ms, "metric.dispatch_latency");
            }
            ObserverMetric::RemediationsInFlight(count) => {
                info!(count = count, "metric.remediations_in_flight");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
