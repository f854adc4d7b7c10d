use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub type DispatchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Value, DispatchError>> + Send + 'a>>;

/// One call to one worker action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub worker_id: String,
    pub action: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl DispatchRequest {
    pub fn new(worker_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            action: action.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// The single seam through which every worker is reached.
///
/// Implementations must honour `timeout` as a wall-clock bound and report an
/// elapsed timeout as [`DispatchError::Transient`]. Callers may re-send the same
/// request after a transient failure, so workers have to tolerate duplicates.
pub trait DispatchGateway: Send + Sync {
    /// Gateway identifier, used in logs.
    fn name(&self) -> &str;

    fn dispatch<'a>(&'a self, request: &'a DispatchRequest, timeout: Duration)
    -> DispatchFuture<'a>;
}
