use serde::{Deserialize, Serialize};

/// Timing of forward dispatch and compensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaConfig {
    /// Wall-clock bound on one dispatch attempt
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
