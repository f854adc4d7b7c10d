use crate::core::planner::{PlanStatus, StepStatus};
use crate::platform::operator::HealthStatus;
use std::time::Duration;

/// Events the observer can record
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    PlanTransition {
        plan_id: String,
        from: PlanStatus,
        to: PlanStatus,
    },
    StepDispatched {
        plan_id: String,
        step_id: String,
        action: String,
        worker: String,
        attempts: u32,
        status: StepStatus,
    },
    StepCompensated {
        plan_id: String,
        step_id: String,
        compensation: Option<String>,
        error: Option<String>,
    },
    HealthUpdated {
        service: String,
        status: HealthStatus,
    },
    RemediationQueued {
        service: String,
        task_id: String,
        action: String,
    },
    RemediationStarted {
        service: String,
        task_id: String,
    },
    RemediationSucceeded {
        service: String,
        task_id: String,
    },
    RemediationFailed {
        service: String,
        task_id: String,
        error: String,
    },
    Error {
        component: String,
        message: String,
    },
}

/// Numeric metrics
#[derive(Debug, Clone)]
pub enum ObserverMetric {
    DispatchLatency { action: String, duration: Duration },
    RemediationsInFlight(u64),
}

/// Sink for plan, health and remediation events
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Record a numeric metric
    fn record_metric(&self, metric: &ObserverMetric);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
