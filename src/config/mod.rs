pub mod schema;

pub use schema::{
    Config, GatewayConfig, ObservabilityConfig, OperatorConfig, SagaConfig, WorkerEndpoint,
};
