use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) =
            std::env::var("AGICORE_GATEWAY_HOST").or_else(|_| std::env::var("HOST"))
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(port_str) =
            std::env::var("AGICORE_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(timeout_str) = std::env::var("AGICORE_DISPATCH_TIMEOUT_SECS")
            && let Ok(timeout) = timeout_str.parse::<u64>()
            && timeout > 0
        {
            self.saga.dispatch_timeout_secs = timeout;
        }

        if let Ok(retries_str) = std::env::var("AGICORE_MAX_RETRIES")
            && let Ok(retries) = retries_str.parse::<u32>()
        {
            self.saga.max_retries = retries;
        }

        if let Ok(path) = std::env::var("AGICORE_CAPABILITIES_PATH")
            && !path.is_empty()
        {
            self.capabilities_path = Some(PathBuf::from(path));
        }
    }
}
