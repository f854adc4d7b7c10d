use crate::config::Config;
use crate::core::capabilities::CapabilityRegistry;
use crate::core::dispatch::{DispatchGateway, HttpDispatchGateway, RetryPolicy};
use crate::core::planner::{Goal, Plan, PlanStore, Planner, SagaExecutor};
use crate::error::PlannerError;
use crate::platform::operator::{HealthMonitor, HealthStore, RemediationEngine};
use crate::runtime::observability::{Observer, create_observer};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Every long-lived component, wired once at startup and shared by the
/// gateway, the daemon and the one-shot CLI commands.
pub struct Services {
    pub config: Arc<Config>,
    pub registry: Arc<CapabilityRegistry>,
    pub planner: Planner,
    pub plans: Arc<PlanStore>,
    pub executor: Arc<SagaExecutor>,
    pub health: Arc<HealthStore>,
    pub remediation: Arc<RemediationEngine>,
    pub monitor: Arc<HealthMonitor>,
    pub observer: Arc<dyn Observer>,
}

impl Services {
    /// Load the capability registry and reach workers over HTTP.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let registry = load_registry(&config)?;
        let gateway: Arc<dyn DispatchGateway> =
            Arc::new(HttpDispatchGateway::from_config(&config.workers));
        Ok(Self::with_gateway(config, registry, gateway))
    }

    pub fn with_gateway(
        config: Arc<Config>,
        registry: CapabilityRegistry,
        gateway: Arc<dyn DispatchGateway>,
    ) -> Self {
        let observer = create_observer(&config.observability);
        let registry = Arc::new(registry);
        let plans = Arc::new(PlanStore::new());

        let executor = Arc::new(
            SagaExecutor::new(
                Arc::clone(&plans),
                Arc::clone(&registry),
                Arc::clone(&gateway),
                RetryPolicy::from_config(&config.saga),
            )
            .with_observer(Arc::clone(&observer)),
        );

        let health = Arc::new(HealthStore::new());
        let remediation = Arc::new(
            RemediationEngine::new(
                Arc::clone(&health),
                Arc::clone(&gateway),
                Duration::from_secs(config.operator.remediation_timeout_secs.max(1)),
            )
            .with_observer(Arc::clone(&observer)),
        );
        let monitor = Arc::new(
            HealthMonitor::new(
                Arc::clone(&health),
                Arc::clone(&remediation),
                gateway,
                &config.operator,
            )
            .with_observer(Arc::clone(&observer)),
        );

        Self {
            planner: Planner::new(Arc::clone(&registry)),
            config,
            registry,
            plans,
            executor,
            health,
            remediation,
            monitor,
            observer,
        }
    }

    /// Decompose a goal and store the resulting pending plan.
    pub fn create_plan(&self, goal: &Goal) -> Result<Plan, PlannerError> {
        let plan = self.planner.decompose(goal)?;
        Ok(self.plans.insert(plan))
    }

    /// Register `operator.tracked_services` as healthy.
    pub fn seed_tracked_services(&self) {
        for service in &self.config.operator.tracked_services {
            self.monitor.register(service);
        }
    }
}

pub fn load_registry(config: &Config) -> Result<CapabilityRegistry> {
    match &config.capabilities_path {
        Some(path) => CapabilityRegistry::load(path),
        None => CapabilityRegistry::builtin(),
    }
}
