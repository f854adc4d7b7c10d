use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Services registered as healthy when the daemon starts
    #[serde(default = "default_tracked_services")]
    pub tracked_services: Vec<String>,
    /// Action dispatched to an unhealthy service
    #[serde(default = "default_remediation_action")]
    pub remediation_action: String,
    #[serde(default = "default_remediation_timeout_secs")]
    pub remediation_timeout_secs: u64,
    /// Active probe period; 0 disables the background prober
    #[serde(default)]
    pub probe_interval_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

fn default_tracked_services() -> Vec<String> {
    vec!["agicore-trader".into(), "agicore-mediamaker".into()]
}

fn default_remediation_action() -> String {
    "restart".into()
}

fn default_remediation_timeout_secs() -> u64 {
    60
}

fn default_probe_timeout_secs() -> u64 {
    10
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            tracked_services: default_tracked_services(),
            remediation_action: default_remediation_action(),
            remediation_timeout_secs: default_remediation_timeout_secs(),
            probe_interval_secs: 0,
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}
