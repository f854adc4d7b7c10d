use super::types::Plan;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// One plan plus the lock that serialises its executions.
pub struct PlanSlot {
    plan: Mutex<Plan>,
    execution: tokio::sync::Mutex<()>,
}

impl PlanSlot {
    fn new(plan: Plan) -> Self {
        Self {
            plan: Mutex::new(plan),
            execution: tokio::sync::Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Plan {
        self.plan
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutate the plan. The guard is released before this returns, so `f` must
    /// not await.
    pub fn update<R>(&self, f: impl FnOnce(&mut Plan) -> R) -> R {
        let mut plan = self.plan.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut plan)
    }

    pub fn execution_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.execution
    }
}

/// Process-lifetime plan table.
///
/// The map lock only guards lookup and insertion; each plan lives in its own
/// slot so executions of different plans never contend.
#[derive(Default)]
pub struct PlanStore {
    plans: RwLock<HashMap<String, Arc<PlanSlot>>>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, plan: Plan) -> Plan {
        let snapshot = plan.clone();
        self.plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(plan.id.clone(), Arc::new(PlanSlot::new(plan)));
        snapshot
    }

    pub fn slot(&self, plan_id: &str) -> Option<Arc<PlanSlot>> {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(plan_id)
            .cloned()
    }

    pub fn get(&self, plan_id: &str) -> Option<Plan> {
        self.slot(plan_id).map(|slot| slot.snapshot())
    }

    /// All plans, oldest first.
    pub fn list(&self) -> Vec<Plan> {
        let slots: Vec<_> = self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut plans: Vec<_> = slots.iter().map(|slot| slot.snapshot()).collect();
        plans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        plans
    }

    pub fn len(&self) -> usize {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
