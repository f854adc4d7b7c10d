mod registry;

pub use registry::{CapabilityRegistry, CapabilitySpec};
