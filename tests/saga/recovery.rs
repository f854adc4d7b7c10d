use crate::support::{FakeFleet, builtin_services};
use agicore::core::planner::{Goal, PlanStatus, StepStatus};
use agicore::error::{DispatchError, PlannerError};
use std::sync::Arc;
use std::time::Duration;

fn storage_blip() -> Result<serde_json::Value, DispatchError> {
    Err(DispatchError::transient("agicore-storage", "store_object", "HTTP 503"))
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let fleet = Arc::new(FakeFleet::new());
    fleet.reply("store_object", storage_blip()).reply("store_object", storage_blip());
    let services = builtin_services(&fleet);
    let plan = services
        .create_plan(&Goal::new("Analyze sentiment for solar stocks"))
        .unwrap();

    let status = services.executor.execute(&plan.id).await.unwrap();

    assert_eq!(status, PlanStatus::Completed);
    let stored = services.plans.get(&plan.id).unwrap();
    assert_eq!(stored.steps[1].attempts, 3);
    assert_eq!(fleet.count("store_object"), 3);
}

#[tokio::test]
async fn exhausted_retries_fail_the_step() {
    let fleet = Arc::new(FakeFleet::new());
    for _ in 0..4 {
        fleet.reply("store_object", storage_blip());
    }
    let services = builtin_services(&fleet);
    let plan = services
        .create_plan(&Goal::new("Analyze sentiment for solar stocks"))
        .unwrap();

    let status = services.executor.execute(&plan.id).await.unwrap();

    assert_eq!(status, PlanStatus::Failed);
    let stored = services.plans.get(&plan.id).unwrap();
    assert_eq!(stored.steps[1].status, StepStatus::Failed);
    assert_eq!(stored.steps[1].attempts, 4);
    assert!(stored.steps[1].error.as_deref().unwrap().contains("retries exhausted"));
}

#[tokio::test]
async fn failed_plan_can_be_retried() {
    let fleet = Arc::new(FakeFleet::new());
    fleet.reply(
        "store_object",
        Err(DispatchError::permanent("agicore-storage", "store_object", "HTTP 404")),
    );
    let services = builtin_services(&fleet);
    let plan = services
        .create_plan(&Goal::new("Analyze sentiment for solar stocks"))
        .unwrap();

    assert_eq!(
        services.executor.execute(&plan.id).await.unwrap(),
        PlanStatus::Failed
    );
    assert_eq!(
        services.executor.execute(&plan.id).await.unwrap(),
        PlanStatus::Completed
    );

    let stored = services.plans.get(&plan.id).unwrap();
    assert!(stored.all_succeeded());
    assert_eq!(
        stored.status_path(),
        vec![
            PlanStatus::Pending,
            PlanStatus::Running,
            PlanStatus::Compensating,
            PlanStatus::Failed,
            PlanStatus::Running,
            PlanStatus::Completed
        ]
    );
}

#[tokio::test]
async fn cancelling_idle_plan_fails_without_dispatch() {
    let fleet = Arc::new(FakeFleet::new());
    let services = builtin_services(&fleet);
    let plan = services
        .create_plan(&Goal::new("Generate an image of a lighthouse"))
        .unwrap();

    let status = services.executor.cancel(&plan.id).await.unwrap();

    assert_eq!(status, PlanStatus::Failed);
    assert!(fleet.calls().is_empty());
    let stored = services.plans.get(&plan.id).unwrap();
    assert_eq!(stored.steps[0].status, StepStatus::Skipped);
}

#[tokio::test]
async fn cancelling_running_plan_stops_between_steps() {
    let fleet = Arc::new(FakeFleet::with_latency(Duration::from_millis(40)));
    let services = Arc::new(builtin_services(&fleet));
    let plan = services
        .create_plan(&Goal::new("Analyze sentiment for solar stocks"))
        .unwrap();

    let run = services.executor.spawn_execute(&plan.id).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    services.executor.cancel(&plan.id).await.unwrap();

    assert_eq!(run.await.unwrap().unwrap(), PlanStatus::Failed);
    assert_eq!(fleet.count("analyze_news"), 1);
    assert_eq!(fleet.count("store_object"), 0);
    let stored = services.plans.get(&plan.id).unwrap();
    assert_eq!(stored.steps[1].status, StepStatus::Skipped);
}

#[tokio::test]
async fn completed_plan_cannot_be_cancelled() {
    let fleet = Arc::new(FakeFleet::new());
    let services = builtin_services(&fleet);
    let plan = services
        .create_plan(&Goal::new("Generate an image of a lighthouse"))
        .unwrap();
    services.executor.execute(&plan.id).await.unwrap();

    let error = services.executor.cancel(&plan.id).await.unwrap_err();
    assert!(matches!(error, PlannerError::PlanNotCancellable(_)));
}

#[tokio::test]
async fn unknown_plan_is_not_found() {
    let services = builtin_services(&Arc::new(FakeFleet::new()));
    let error = services.executor.execute("plan_missing").await.unwrap_err();
    assert!(matches!(error, PlannerError::PlanNotFound(_)));
}
