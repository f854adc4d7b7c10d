use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a worker listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEndpoint {
    pub base_url: String,
}

impl WorkerEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

pub fn default_workers() -> BTreeMap<String, WorkerEndpoint> {
    [
        ("agicore-analytics", "http://127.0.0.1:8081"),
        ("agicore-mediamaker", "http://127.0.0.1:8082"),
        ("agicore-storage", "http://127.0.0.1:8083"),
        ("agicore-trader", "http://127.0.0.1:8084"),
    ]
    .into_iter()
    .map(|(worker, url)| (worker.to_string(), WorkerEndpoint::new(url)))
    .collect()
}
