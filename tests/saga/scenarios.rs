use crate::support::{FakeFleet, builtin_services, services_with};
use agicore::core::capabilities::CapabilityRegistry;
use agicore::core::planner::{Goal, ORIGINAL_RESULT_KEY, PlanStatus, StepStatus};
use agicore::error::{DispatchError, PlannerError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const ANALYSIS_WITH_UNDO: &str = r#"
[workers.agicore-analytics.analyze_news]
description = "Sentiment analysis"
compensation = "discard_analysis"
parameters = { type = "object", required = ["topic"] }

[workers.agicore-analytics.discard_analysis]
description = "Forget a cached analysis"

[workers.agicore-storage.store_object]
description = "Store a JSON object"
compensation = "delete_object"
parameters = { type = "object", required = ["bucket", "key"] }

[workers.agicore-storage.delete_object]
description = "Delete a stored object"
"#;

#[tokio::test]
async fn image_goal_runs_one_step_to_completion() {
    let fleet = Arc::new(FakeFleet::new());
    let services = builtin_services(&fleet);

    let plan = services
        .create_plan(&Goal::new("Generate an image of a futuristic city"))
        .unwrap();
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].action, "generate_image");
    assert_eq!(plan.steps[0].target_worker, "agicore-mediamaker");
    assert_eq!(plan.steps[0].parameters["prompt"], "a futuristic city");

    let status = services.executor.execute(&plan.id).await.unwrap();
    assert_eq!(status, PlanStatus::Completed);

    let stored = services.plans.get(&plan.id).unwrap();
    assert_eq!(stored.steps[0].status, StepStatus::Succeeded);
    assert_eq!(
        stored.status_path(),
        vec![PlanStatus::Pending, PlanStatus::Running, PlanStatus::Completed]
    );
}

#[tokio::test]
async fn permanent_failure_skips_steps_without_compensation() {
    let fleet = Arc::new(FakeFleet::new());
    fleet.reply(
        "store_object",
        Err(DispatchError::permanent("agicore-storage", "store_object", "HTTP 400: bucket missing")),
    );
    let services = builtin_services(&fleet);
    let plan = services
        .create_plan(&Goal::new("Analyze sentiment for solar stocks"))
        .unwrap();

    let status = services.executor.execute(&plan.id).await.unwrap();

    assert_eq!(status, PlanStatus::Failed);
    let stored = services.plans.get(&plan.id).unwrap();
    assert_eq!(stored.steps[0].status, StepStatus::Skipped);
    assert_eq!(stored.steps[1].status, StepStatus::Failed);
    assert!(stored.steps[1].error.as_deref().unwrap().contains("bucket missing"));
    assert_eq!(
        stored.status_path(),
        vec![
            PlanStatus::Pending,
            PlanStatus::Running,
            PlanStatus::Compensating,
            PlanStatus::Failed
        ]
    );
}

#[tokio::test]
async fn permanent_failure_compensates_registered_steps() {
    let fleet = Arc::new(FakeFleet::new());
    fleet
        .reply("analyze_news", Ok(json!({"sentiment": 0.42})))
        .reply(
            "store_object",
            Err(DispatchError::permanent("agicore-storage", "store_object", "quota")),
        );
    let registry = CapabilityRegistry::from_toml_str(ANALYSIS_WITH_UNDO).unwrap();
    let services = services_with(&fleet, registry);
    let plan = services
        .create_plan(&Goal::new("Analyze sentiment for solar stocks"))
        .unwrap();

    let status = services.executor.execute(&plan.id).await.unwrap();

    assert_eq!(status, PlanStatus::Failed);
    let stored = services.plans.get(&plan.id).unwrap();
    assert_eq!(stored.steps[0].status, StepStatus::Compensated);
    assert_eq!(stored.steps[1].status, StepStatus::Failed);
    assert_eq!(
        fleet.actions(),
        vec!["analyze_news", "store_object", "discard_analysis"]
    );

    let undo = fleet
        .calls()
        .into_iter()
        .find(|call| call.action == "discard_analysis")
        .unwrap();
    assert_eq!(undo.worker_id, "agicore-analytics");
    assert_eq!(undo.parameters[ORIGINAL_RESULT_KEY], json!({"sentiment": 0.42}));
}

#[tokio::test]
async fn trade_goal_routes_to_trader() {
    let fleet = Arc::new(FakeFleet::new());
    let services = builtin_services(&fleet);

    let plan = services
        .create_plan(&Goal::new("Buy 10 shares of NVDA"))
        .unwrap();
    services.executor.execute(&plan.id).await.unwrap();

    let calls = fleet.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.worker_id == "agicore-trader"));
    assert_eq!(calls[1].action, "execute_trade");
    assert_eq!(calls[1].parameters["symbol"], "NVDA");
    assert_eq!(calls[1].parameters["quantity"], 10);
    assert_eq!(calls[1].parameters["action"], "BUY");
}

#[tokio::test]
async fn unknown_required_action_is_rejected_before_storage() {
    let fleet = Arc::new(FakeFleet::new());
    let services = builtin_services(&fleet);

    let error = services
        .create_plan(&Goal::new("Analyze chips").with_constraint("require:launch_rocket"))
        .unwrap_err();

    assert!(matches!(error, PlannerError::CapabilityUnavailable { .. }));
    assert!(services.plans.is_empty());
}

#[tokio::test]
async fn concurrent_executes_dispatch_each_step_once() {
    let fleet = Arc::new(FakeFleet::with_latency(Duration::from_millis(25)));
    let services = Arc::new(builtin_services(&fleet));
    let plan = services
        .create_plan(&Goal::new("Analyze trend forecast for wind energy"))
        .unwrap();

    let runs = (0..8).map(|_| {
        let services = Arc::clone(&services);
        let plan_id = plan.id.clone();
        tokio::spawn(async move { services.executor.execute(&plan_id).await })
    });
    let statuses: Vec<PlanStatus> = futures_util::future::join_all(runs)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(statuses.contains(&PlanStatus::Completed));
    assert_eq!(fleet.count("analyze_news"), 1);
    assert_eq!(fleet.count("store_object"), 1);

    let status = services.executor.execute(&plan.id).await.unwrap();
    assert_eq!(status, PlanStatus::Completed);
    assert_eq!(fleet.calls().len(), 2);
}
