mod monitor;
mod prober;
mod remediation;
mod store;
mod types;

pub use monitor::HealthMonitor;
pub use prober::{probe_all, run_prober};
pub use remediation::RemediationEngine;
pub use store::HealthStore;
pub use types::{
    HealthReport, HealthStatus, QueueOutcome, RemediationEvent, RemediationStatus,
    RemediationTask, ReportReceipt, ServiceHealthRecord,
};
