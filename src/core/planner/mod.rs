mod decompose;
mod executor;
mod store;
mod strategy;
mod types;

pub use decompose::Planner;
pub use executor::{ORIGINAL_RESULT_KEY, SagaExecutor};
pub use store::{PlanSlot, PlanStore};
pub use strategy::{DecompositionStrategy, KeywordStrategy, REPORTS_BUCKET, StepDraft};
pub use types::{Goal, Plan, PlanStatus, PlanTransition, Step, StepStatus};
