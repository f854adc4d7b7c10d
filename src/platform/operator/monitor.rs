use super::remediation::RemediationEngine;
use super::store::HealthStore;
use super::types::{HealthReport, HealthStatus, QueueOutcome, ReportReceipt, ServiceHealthRecord};
use crate::config::OperatorConfig;
use crate::core::dispatch::{DispatchGateway, DispatchRequest, HEALTH_ACTION, dispatch_bounded};
use crate::error::HealthError;
use crate::runtime::observability::{NoopObserver, Observer, ObserverEvent};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const ACTION_NONE: &str = "none";
const ACTION_ALREADY_IN_FLIGHT: &str = "already_in_flight";

/// Folds reports and probe results into the health store and hands
/// unhealthy services to the remediation engine.
pub struct HealthMonitor {
    store: Arc<HealthStore>,
    remediation: Arc<RemediationEngine>,
    gateway: Arc<dyn DispatchGateway>,
    remediation_action: String,
    probe_timeout: Duration,
    observer: Arc<dyn Observer>,
}

impl HealthMonitor {
    pub fn new(
        store: Arc<HealthStore>,
        remediation: Arc<RemediationEngine>,
        gateway: Arc<dyn DispatchGateway>,
        config: &OperatorConfig,
    ) -> Self {
        Self {
            store,
            remediation,
            gateway,
            remediation_action: config.remediation_action.clone(),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs.max(1)),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn remediation(&self) -> &Arc<RemediationEngine> {
        &self.remediation
    }

    /// Track a service. Already tracked services keep their current record.
    pub fn register(&self, service_name: &str) -> ServiceHealthRecord {
        let (record, created) = self.store.register(service_name);
        if created {
            tracing::info!(service = service_name, "Tracking service");
        }
        record
    }

    pub fn receive_report(&self, report: HealthReport) -> Result<ReportReceipt, HealthError> {
        let service_name = report.service_name.trim();
        if service_name.is_empty() {
            return Err(HealthError::InvalidReport(
                "service_name cannot be empty".into(),
            ));
        }

        let record = self
            .store
            .upsert(service_name, report.status, report.details);
        tracing::info!(
            service = service_name,
            status = %record.status,
            "Health report received"
        );
        self.observer.record_event(&ObserverEvent::HealthUpdated {
            service: record.service_name.clone(),
            status: record.status,
        });

        if record.status != HealthStatus::Unhealthy {
            return Ok(ReportReceipt {
                record,
                action_taken: ACTION_NONE.to_string(),
                remediation: None,
            });
        }

        let (action_taken, task) = match self.remediation.queue(service_name, &self.remediation_action)
        {
            QueueOutcome::Queued(task) => (format!("queued_{}", task.action), task),
            QueueOutcome::AlreadyInFlight(task) => (ACTION_ALREADY_IN_FLIGHT.to_string(), task),
        };
        Ok(ReportReceipt {
            record,
            action_taken,
            remediation: Some(task),
        })
    }

    /// Ask the service for its health and fold the answer in like a report.
    pub async fn active_probe(&self, service_name: &str) -> Result<ReportReceipt, HealthError> {
        if !self.store.contains(service_name) {
            return Err(HealthError::ServiceNotTracked(service_name.to_string()));
        }

        let request = DispatchRequest::new(service_name, HEALTH_ACTION);
        let report = match dispatch_bounded(self.gateway.as_ref(), &request, self.probe_timeout).await
        {
            Ok(reply) => report_from_reply(service_name, &reply),
            Err(error) => {
                HealthReport::new(service_name, HealthStatus::Unhealthy).with_details(error.to_string())
            }
        };
        self.receive_report(report)
    }

    pub fn record(&self, service_name: &str) -> Result<ServiceHealthRecord, HealthError> {
        self.store
            .get(service_name)
            .ok_or_else(|| HealthError::ServiceNotTracked(service_name.to_string()))
    }

    pub fn records(&self) -> Vec<ServiceHealthRecord> {
        self.store.list()
    }

    pub fn tracked_services(&self) -> Vec<String> {
        self.store.service_names()
    }
}

/// Workers answer `GET /health` with `{"status": "...", ...}`.
fn report_from_reply(service_name: &str, reply: &Value) -> HealthReport {
    let raw_status = reply.get("status").and_then(Value::as_str);
    let status = raw_status.map_or(HealthStatus::Degraded, HealthStatus::from_reported);
    let details = reply
        .get("details")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| match raw_status {
            Some(raw) => format!("probe reported '{raw}'"),
            None => "probe reply carried no status".to_string(),
        });
    HealthReport::new(service_name, status).with_details(details)
}
