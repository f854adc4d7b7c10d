use crate::error::PlannerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    Running,
    Compensating,
    Completed,
    Failed,
}

impl PlanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// `failed → running` is the retry edge; everything else only moves forward.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending | Self::Failed, Self::Running)
                | (Self::Running, Self::Completed | Self::Compensating)
                | (Self::Compensating, Self::Failed)
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Dispatched,
    Succeeded,
    Failed,
    Compensated,
    Skipped,
}

/// What the caller wants done. Consumed once by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub description: String,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl Goal {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub action: String,
    pub target_worker: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Dispatch attempts made by the most recent forward run.
    #[serde(default)]
    pub attempts: u32,
}

impl Step {
    pub fn new(
        index: usize,
        action: impl Into<String>,
        target_worker: impl Into<String>,
        parameters: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id: format!("step-{}", index + 1),
            action: action.into(),
            target_worker: target_worker.into(),
            parameters,
            status: StepStatus::Pending,
            result: None,
            error: None,
            attempts: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTransition {
    pub status: PlanStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub goal: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub status: PlanStatus,
    pub steps: Vec<Step>,
    /// Every status the plan has held, oldest first.
    pub transitions: Vec<PlanTransition>,
    #[serde(default)]
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(goal: &Goal, steps: Vec<Step>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("plan_{}", Uuid::new_v4().simple()),
            goal: goal.description.clone(),
            constraints: goal.constraints.clone(),
            status: PlanStatus::Pending,
            steps,
            transitions: vec![PlanTransition {
                status: PlanStatus::Pending,
                at: now,
            }],
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, target: PlanStatus) -> Result<(), PlannerError> {
        if !self.status.can_transition_to(target) {
            return Err(PlannerError::InvalidPlanState {
                plan_id: self.id.clone(),
                status: format!("{} (requested {target})", self.status),
            });
        }
        let now = Utc::now();
        self.status = target;
        self.transitions.push(PlanTransition {
            status: target,
            at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn status_path(&self) -> Vec<PlanStatus> {
        self.transitions.iter().map(|t| t.status).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.steps
            .iter()
            .all(|step| step.status == StepStatus::Succeeded)
    }

    /// Put every step that did not succeed back to `pending` before a retry.
    pub fn reset_unsucceeded_steps(&mut self) {
        for step in &mut self.steps {
            if step.status != StepStatus::Succeeded {
                step.status = StepStatus::Pending;
                step.result = None;
                step.error = None;
                step.attempts = 0;
            }
        }
        self.cancel_requested = false;
        self.updated_at = Utc::now();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
