mod core;
mod gateway;
mod observability;
mod operator;
mod saga;
mod workers;

pub use core::Config;
pub use gateway::GatewayConfig;
pub use observability::ObservabilityConfig;
pub use operator::OperatorConfig;
pub use saga::SagaConfig;
pub use workers::{WorkerEndpoint, default_workers};
