use super::strategy::{DecompositionStrategy, KeywordStrategy};
use super::types::{Goal, Plan, Step};
use crate::core::capabilities::CapabilityRegistry;
use crate::error::PlannerError;
use std::collections::BTreeSet;
use std::sync::Arc;

const REQUIRE_PREFIX: &str = "require:";
const SKIP_PREFIX: &str = "skip:";

/// Turns goals into pending plans routed against the capability registry.
pub struct Planner {
    registry: Arc<CapabilityRegistry>,
    strategy: Arc<dyn DecompositionStrategy>,
}

impl Planner {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            strategy: Arc::new(KeywordStrategy),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn DecompositionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn decompose(&self, goal: &Goal) -> Result<Plan, PlannerError> {
        if goal.description.trim().is_empty() {
            return Err(PlannerError::Validation(
                "goal description cannot be empty".into(),
            ));
        }

        let mut skipped = BTreeSet::new();
        for constraint in &goal.constraints {
            let constraint = constraint.trim();
            if let Some(action) = constraint.strip_prefix(REQUIRE_PREFIX) {
                let action = action.trim();
                if self.registry.resolve(action).is_none() {
                    return Err(PlannerError::CapabilityUnavailable {
                        action: action.to_string(),
                    });
                }
            } else if let Some(action) = constraint.strip_prefix(SKIP_PREFIX) {
                skipped.insert(action.trim().to_string());
            }
        }

        let drafts = self.strategy.draft(goal)?;
        let drafts: Vec<_> = drafts
            .into_iter()
            .filter(|draft| !skipped.contains(&draft.action))
            .collect();
        if drafts.is_empty() {
            return Err(PlannerError::Validation(
                "goal produced no steps after applying constraints".into(),
            ));
        }

        let mut steps = Vec::with_capacity(drafts.len());
        for (index, draft) in drafts.into_iter().enumerate() {
            let Some((worker, spec)) = self.registry.resolve(&draft.action) else {
                return Err(PlannerError::CapabilityUnavailable {
                    action: draft.action,
                });
            };
            spec.check_parameters(&draft.action, &draft.parameters)?;
            steps.push(Step::new(index, draft.action, worker, draft.parameters));
        }

        let plan = Plan::new(goal, steps);
        tracing::info!(
            plan_id = plan.id.as_str(),
            strategy = self.strategy.name(),
            steps = plan.steps.len(),
            "Decomposed goal into plan"
        );
        Ok(plan)
    }
}
