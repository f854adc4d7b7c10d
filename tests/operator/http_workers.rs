use crate::support::fast_config;
use agicore::app::services::Services;
use agicore::config::WorkerEndpoint;
use agicore::core::planner::{Goal, PlanStatus, StepStatus};
use agicore::platform::operator::HealthStatus;
use agicore::transport::gateway::run_gateway_with_listener;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn services_against(server: &MockServer) -> Arc<Services> {
    let mut config = fast_config();
    for endpoint in config.workers.values_mut() {
        *endpoint = WorkerEndpoint::new(server.uri());
    }
    Arc::new(Services::from_config(Arc::new(config)).expect("services build"))
}

#[tokio::test]
async fn plan_runs_against_http_workers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze-news"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sentiment": "positive"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/store-object"))
        .and(body_partial_json(json!({"bucket": "agicore-reports"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored": true})))
        .expect(1)
        .mount(&server)
        .await;
    let services = services_against(&server);

    let plan = services
        .create_plan(&Goal::new("Analyze sentiment for solar stocks"))
        .unwrap();
    let status = services.executor.execute(&plan.id).await.unwrap();

    assert_eq!(status, PlanStatus::Completed);
    let stored = services.plans.get(&plan.id).unwrap();
    assert_eq!(stored.steps[0].result, Some(json!({"sentiment": "positive"})));
}

#[tokio::test]
async fn rejected_worker_call_compensates_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get-market-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"close": 912.4})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute-trade"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"detail": "insufficient funds"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let services = services_against(&server);

    let plan = services
        .create_plan(&Goal::new("sell 5 TSLA"))
        .unwrap();
    let status = services.executor.execute(&plan.id).await.unwrap();

    assert_eq!(status, PlanStatus::Failed);
    let stored = services.plans.get(&plan.id).unwrap();
    assert_eq!(stored.steps[0].status, StepStatus::Skipped);
    assert_eq!(stored.steps[1].status, StepStatus::Failed);
    assert!(
        stored.steps[1]
            .error
            .as_deref()
            .unwrap()
            .contains("insufficient funds")
    );
}

#[tokio::test]
async fn probe_over_api_restarts_failing_worker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/restart"))
        .and(body_partial_json(json!({"service_name": "agicore-trader"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"restarted": true})))
        .expect(1)
        .mount(&server)
        .await;
    let services = services_against(&server);
    services.seed_tracked_services();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let gateway = tokio::spawn(run_gateway_with_listener(
        "127.0.0.1",
        listener,
        Arc::clone(&services),
    ));
    let client = reqwest::Client::new();

    let record: Value = client
        .post(format!("http://{addr}/operator/services/agicore-trader/probe"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["status"], "unhealthy");
    assert!(record["details"].as_str().unwrap().contains("503"));

    let mut task = Value::Null;
    for _ in 0..100 {
        task = client
            .get(format!("http://{addr}/operator/remediation/agicore-trader"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if task["status"] == "succeeded" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(task["status"], "succeeded");
    assert_eq!(task["action"], "restart");
    assert_eq!(
        services.monitor.record("agicore-trader").unwrap().status,
        HealthStatus::Healthy
    );

    gateway.abort();
}
