use serde::{Deserialize, Serialize};

/// Where observer events go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `log` emits through `tracing`; `none` drops events
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_backend() -> String {
    "log".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}
