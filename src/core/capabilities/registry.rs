use crate::error::PlannerError;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_CAPABILITIES: &str = include_str!("builtin.toml");

/// One action a worker can perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    #[serde(default)]
    pub description: String,
    /// Action on the same worker that undoes this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation: Option<String>,
    /// JSON-schema-like parameter description. Only `required` is enforced.
    #[serde(default = "default_parameters")]
    pub parameters: Value,
}

fn default_parameters() -> Value {
    serde_json::json!({"type": "object"})
}

impl CapabilitySpec {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            compensation: None,
            parameters: default_parameters(),
        }
    }

    pub fn with_compensation(mut self, action: impl Into<String>) -> Self {
        self.compensation = Some(action.into());
        self
    }

    pub fn with_required(mut self, keys: &[&str]) -> Self {
        self.parameters["required"] = Value::from(keys.to_vec());
        self
    }

    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn check_parameters(
        &self,
        action: &str,
        params: &BTreeMap<String, Value>,
    ) -> Result<(), PlannerError> {
        let missing = self
            .required_parameters()
            .into_iter()
            .filter(|key| params.get(*key).is_none_or(Value::is_null))
            .collect::<Vec<_>>();
        if missing.is_empty() {
            return Ok(());
        }
        Err(PlannerError::Validation(format!(
            "action {action} is missing required parameters: [{}]",
            missing.join(", ")
        )))
    }
}

/// Declarative mapping of worker id to the actions it offers.
///
/// Keys are kept in `BTreeMap`s so that action resolution and listings are
/// deterministic across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityRegistry {
    #[serde(default)]
    workers: BTreeMap<String, BTreeMap<String, CapabilitySpec>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry describing the standard analytics/media/storage/trader fleet.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CAPABILITIES).context("parse built-in capability registry")
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let registry: Self = toml::from_str(raw).context("invalid capability document")?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read capability registry {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("load capability registry {}", path.display()))
    }

    /// Register an action. Replaces any existing spec for the same worker/action.
    pub fn register(
        &mut self,
        worker: impl Into<String>,
        action: impl Into<String>,
        spec: CapabilitySpec,
    ) {
        self.workers
            .entry(worker.into())
            .or_default()
            .insert(action.into(), spec);
    }

    /// Every declared compensation must be an action of the same worker.
    pub fn validate(&self) -> Result<()> {
        for (worker, actions) in &self.workers {
            if worker.trim().is_empty() {
                bail!("worker id cannot be empty");
            }
            for (action, spec) in actions {
                if let Some(compensation) = &spec.compensation
                    && !actions.contains_key(compensation)
                {
                    bail!(
                        "worker {worker} action {action} declares compensation {compensation}, \
                         which the worker does not offer"
                    );
                }
            }
        }
        Ok(())
    }

    /// Find the worker offering `action`. When several do, the lexicographically
    /// first worker id wins.
    pub fn resolve(&self, action: &str) -> Option<(&str, &CapabilitySpec)> {
        self.workers
            .iter()
            .find_map(|(worker, actions)| actions.get(action).map(|spec| (worker.as_str(), spec)))
    }

    pub fn capability(&self, worker: &str, action: &str) -> Option<&CapabilitySpec> {
        self.workers.get(worker).and_then(|actions| actions.get(action))
    }

    pub fn compensation_for(&self, worker: &str, action: &str) -> Option<&str> {
        self.capability(worker, action)
            .and_then(|spec| spec.compensation.as_deref())
    }

    pub fn workers(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }

    pub fn actions(&self, worker: &str) -> Vec<&str> {
        self.workers
            .get(worker)
            .map(|actions| actions.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
