use super::super::{
    GatewayConfig, ObservabilityConfig, OperatorConfig, SagaConfig, WorkerEndpoint,
    default_workers,
};
use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Capability registry document; the built-in fleet is used when unset
    #[serde(default)]
    pub capabilities_path: Option<PathBuf>,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub saga: SagaConfig,

    #[serde(default)]
    pub operator: OperatorConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default = "default_workers")]
    pub workers: BTreeMap<String, WorkerEndpoint>,
}

pub(super) fn agicore_dir() -> PathBuf {
    UserDirs::new()
        .map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf())
        .join(".agicore")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: agicore_dir().join("config.toml"),
            capabilities_path: None,
            gateway: GatewayConfig::default(),
            saga: SagaConfig::default(),
            operator: OperatorConfig::default(),
            observability: ObservabilityConfig::default(),
            workers: default_workers(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.saga.dispatch_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "saga.dispatch_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.operator.remediation_action.trim().is_empty() {
            return Err(ConfigError::Validation(
                "operator.remediation_action cannot be empty".into(),
            ));
        }
        if let Some((worker, _)) = self
            .workers
            .iter()
            .find(|(_, endpoint)| endpoint.base_url.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "workers.{worker}.base_url cannot be empty"
            )));
        }
        Ok(())
    }
}
