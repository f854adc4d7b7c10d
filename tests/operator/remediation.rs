use crate::support::{FakeFleet, builtin_services};
use agicore::error::DispatchError;
use agicore::platform::operator::{
    HealthReport, HealthStatus, RemediationEvent, RemediationStatus, probe_all,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

async fn next_terminal(events: &mut broadcast::Receiver<RemediationEvent>) -> RemediationEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("remediation channel open");
            if event.is_terminal() {
                return event;
            }
        }
    })
    .await
    .expect("remediation finished in time")
}

#[tokio::test]
async fn duplicate_unhealthy_reports_create_one_task() {
    let fleet = Arc::new(FakeFleet::with_latency(Duration::from_millis(50)));
    let services = builtin_services(&fleet);
    let mut events = services.remediation.subscribe();
    let report = HealthReport::new("agicore-trader", HealthStatus::Unhealthy);

    let first = services.monitor.receive_report(report.clone()).unwrap();
    let second = services.monitor.receive_report(report).unwrap();

    assert_eq!(first.action_taken, "queued_restart");
    assert_eq!(second.action_taken, "already_in_flight");
    assert_eq!(services.remediation.in_flight(), 1);
    assert_eq!(services.remediation.tasks().len(), 1);

    let RemediationEvent::Succeeded(task) = next_terminal(&mut events).await else {
        panic!("remediation should succeed");
    };
    assert_eq!(task.task_id, first.remediation.unwrap().task_id);
    assert_eq!(fleet.count("restart"), 1);
    assert_eq!(services.remediation.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unhealthy_reports_create_one_task() {
    let fleet = Arc::new(FakeFleet::with_latency(Duration::from_millis(50)));
    let services = Arc::new(builtin_services(&fleet));
    let mut events = services.remediation.subscribe();

    let reporters = (0..16).map(|_| {
        let services = Arc::clone(&services);
        tokio::spawn(async move {
            services
                .monitor
                .receive_report(HealthReport::new("agicore-trader", HealthStatus::Unhealthy))
                .unwrap()
        })
    });
    let receipts: Vec<_> = futures_util::future::join_all(reporters)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let queued = receipts
        .iter()
        .filter(|receipt| receipt.action_taken == "queued_restart")
        .count();
    assert_eq!(queued, 1);
    assert_eq!(
        receipts
            .iter()
            .filter(|receipt| receipt.action_taken == "already_in_flight")
            .count(),
        receipts.len() - 1
    );

    next_terminal(&mut events).await;
    assert_eq!(fleet.count("restart"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reports_racing_a_finishing_remediation_end_healthy() {
    let fleet = Arc::new(FakeFleet::with_latency(Duration::from_millis(2)));
    let services = Arc::new(builtin_services(&fleet));

    for _ in 0..20 {
        let reporters = (0..4u64).map(|offset| {
            let services = Arc::clone(&services);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(offset)).await;
                services
                    .monitor
                    .receive_report(HealthReport::new("agicore-trader", HealthStatus::Unhealthy))
                    .unwrap();
            })
        });
        for joined in futures_util::future::join_all(reporters).await {
            joined.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while services.remediation.in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("remediation settled");
        assert_eq!(
            services.monitor.record("agicore-trader").unwrap().status,
            HealthStatus::Healthy
        );
    }
}

#[tokio::test]
async fn successful_remediation_restores_health() {
    let fleet = Arc::new(FakeFleet::new());
    let services = builtin_services(&fleet);
    let mut events = services.remediation.subscribe();

    services
        .monitor
        .receive_report(
            HealthReport::new("agicore-trader", HealthStatus::Unhealthy)
                .with_details("exchange API unreachable"),
        )
        .unwrap();
    next_terminal(&mut events).await;

    let record = services.monitor.record("agicore-trader").unwrap();
    assert_eq!(record.status, HealthStatus::Healthy);
    let restart = &fleet.calls()[0];
    assert_eq!(restart.worker_id, "agicore-trader");
    assert_eq!(restart.parameters["service_name"], "agicore-trader");
}

#[tokio::test]
async fn failed_remediation_leaves_service_unhealthy() {
    let fleet = Arc::new(FakeFleet::new());
    fleet.reply(
        "restart",
        Err(DispatchError::permanent("agicore-trader", "restart", "HTTP 404")),
    );
    let services = builtin_services(&fleet);
    let mut events = services.remediation.subscribe();

    services
        .monitor
        .receive_report(HealthReport::new("agicore-trader", HealthStatus::Unhealthy))
        .unwrap();

    let RemediationEvent::Failed(task) = next_terminal(&mut events).await else {
        panic!("remediation should fail");
    };
    assert_eq!(task.status, RemediationStatus::Failed);
    assert!(task.error.as_deref().unwrap().contains("HTTP 404"));
    assert_eq!(
        services.monitor.record("agicore-trader").unwrap().status,
        HealthStatus::Unhealthy
    );

    let retry = services
        .monitor
        .receive_report(HealthReport::new("agicore-trader", HealthStatus::Unhealthy))
        .unwrap();
    assert_eq!(retry.action_taken, "queued_restart");
    assert_ne!(retry.remediation.unwrap().task_id, task.task_id);
}

#[tokio::test]
async fn probe_sweep_remediates_dead_services_only() {
    let fleet = Arc::new(FakeFleet::new());
    fleet.reply(
        "health",
        Err(DispatchError::transient("agicore-mediamaker", "health", "connection refused")),
    );
    let services = builtin_services(&fleet);
    services.seed_tracked_services();
    let mut events = services.remediation.subscribe();

    let receipts = probe_all(&services.monitor).await;

    assert_eq!(receipts.len(), 2);
    let remediated: Vec<&str> = receipts
        .iter()
        .filter(|receipt| receipt.remediation.is_some())
        .map(|receipt| receipt.record.service_name.as_str())
        .collect();
    assert_eq!(remediated.len(), 1);

    next_terminal(&mut events).await;
    assert!(
        services
            .monitor
            .records()
            .iter()
            .all(|record| record.status == HealthStatus::Healthy)
    );
}
