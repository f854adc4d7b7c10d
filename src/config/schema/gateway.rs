use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway port (default: 8080)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Allow binding to a non-loopback address (default: false)
    #[serde(default)]
    pub allow_public_bind: bool,
    /// Upper bound on one HTTP request, including a synchronous plan execution
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
            allow_public_bind: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
