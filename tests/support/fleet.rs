//! In-memory worker fleet used by the integration tests.

use agicore::Config;
use agicore::app::services::Services;
use agicore::core::capabilities::CapabilityRegistry;
use agicore::core::dispatch::{DispatchFuture, DispatchGateway, DispatchRequest};
use agicore::error::DispatchError;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Replies are queued per action; an action with nothing queued succeeds.
#[derive(Default)]
pub struct FakeFleet {
    replies: Mutex<HashMap<String, VecDeque<Result<Value, DispatchError>>>>,
    calls: Mutex<Vec<DispatchRequest>>,
    latency: Duration,
}

impl FakeFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn reply(&self, action: &str, reply: Result<Value, DispatchError>) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(action.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<DispatchRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.action).collect()
    }

    pub fn count(&self, action: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.action == action)
            .count()
    }
}

impl DispatchGateway for FakeFleet {
    fn name(&self) -> &str {
        "fake-fleet"
    }

    fn dispatch<'a>(
        &'a self,
        request: &'a DispatchRequest,
        _timeout: Duration,
    ) -> DispatchFuture<'a> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let queued = self
                .replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get_mut(&request.action)
                .and_then(VecDeque::pop_front);
            queued.unwrap_or_else(|| match request.action.as_str() {
                "health" => Ok(json!({"status": "healthy"})),
                action => Ok(json!({"ok": true, "action": action})),
            })
        })
    }
}

/// Config with millisecond backoff so retry paths stay fast.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.saga.base_backoff_ms = 1;
    config.saga.max_backoff_ms = 4;
    config.operator.remediation_timeout_secs = 2;
    config
}

pub fn services_with(fleet: &Arc<FakeFleet>, registry: CapabilityRegistry) -> Services {
    Services::with_gateway(
        Arc::new(fast_config()),
        registry,
        Arc::clone(fleet) as Arc<dyn DispatchGateway>,
    )
}

pub fn builtin_services(fleet: &Arc<FakeFleet>) -> Services {
    services_with(fleet, CapabilityRegistry::builtin().expect("built-in registry parses"))
}
