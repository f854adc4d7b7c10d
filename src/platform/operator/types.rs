use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Map a worker's self-reported status. Anything unrecognised counts as
    /// degraded.
    pub fn from_reported(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "healthy" | "ok" | "up" => Self::Healthy,
            "unhealthy" | "down" | "error" => Self::Unhealthy,
            _ => Self::Degraded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealthRecord {
    pub service_name: String,
    pub status: HealthStatus,
    #[serde(default)]
    pub details: String,
    pub last_updated: DateTime<Utc>,
}

impl ServiceHealthRecord {
    pub fn new(service_name: impl Into<String>, status: HealthStatus, details: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            status,
            details: details.into(),
            last_updated: Utc::now(),
        }
    }
}

/// Inbound status report from a worker or an external prober.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub service_name: String,
    pub status: HealthStatus,
    #[serde(default)]
    pub details: String,
}

impl HealthReport {
    pub fn new(service_name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            service_name: service_name.into(),
            status,
            details: String::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RemediationStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RemediationStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationTask {
    pub task_id: String,
    pub service_name: String,
    pub action: String,
    pub status: RemediationStatus,
    pub queued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemediationTask {
    pub fn queued(service_name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            service_name: service_name.into(),
            action: action.into(),
            status: RemediationStatus::Queued,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}

/// Lifecycle notifications published by the remediation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RemediationEvent {
    Queued(RemediationTask),
    Started(RemediationTask),
    Succeeded(RemediationTask),
    Failed(RemediationTask),
}

impl RemediationEvent {
    pub fn task(&self) -> &RemediationTask {
        match self {
            Self::Queued(task) | Self::Started(task) | Self::Succeeded(task) | Self::Failed(task) => {
                task
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

/// Result of asking the engine to remediate a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOutcome {
    Queued(RemediationTask),
    AlreadyInFlight(RemediationTask),
}

impl QueueOutcome {
    pub fn task(&self) -> &RemediationTask {
        match self {
            Self::Queued(task) | Self::AlreadyInFlight(task) => task,
        }
    }

    pub fn into_task(self) -> RemediationTask {
        match self {
            Self::Queued(task) | Self::AlreadyInFlight(task) => task,
        }
    }
}

/// What the monitor did with a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportReceipt {
    pub record: ServiceHealthRecord,
    pub action_taken: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<RemediationTask>,
}
