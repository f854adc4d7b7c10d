use crate::app::services::Services;
use crate::diagnostics::health;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

const MAX_RESTARTS: u32 = 10;

pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
    max_restarts: u32,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut backoff = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(backoff);
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::info!("Daemon component '{name}' starting");
            match run_component().await {
                Ok(()) => {
                    tracing::warn!("Daemon component '{name}' exited unexpectedly");
                    health::mark_component_error(name, "exited unexpectedly");
                    backoff = initial_backoff_secs.max(1);
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
                Err(e) => {
                    tracing::error!("Daemon component '{name}' failed: {e}");
                    health::mark_component_error(name, &e);
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
            }

            if max_restarts > 0 && consecutive_failures > max_restarts {
                tracing::error!(
                    "Daemon component '{name}' exceeded max restarts ({max_restarts}), circuit open"
                );
                break;
            }
            health::bump_component_restart(name);
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}

pub(super) fn spawn_supervised_components(
    services: &Arc<Services>,
    host: String,
    port: u16,
    initial_backoff: u64,
    max_backoff: u64,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    let gateway_services = Arc::clone(services);
    handles.push(spawn_component_supervisor(
        "gateway",
        initial_backoff,
        max_backoff,
        MAX_RESTARTS,
        move || {
            let services = Arc::clone(&gateway_services);
            let host = host.clone();
            async move { crate::transport::gateway::run_gateway(&host, port, services).await }
        },
    ));

    let probe_interval = services.config.operator.probe_interval_secs;
    if probe_interval > 0 {
        let monitor = Arc::clone(&services.monitor);
        handles.push(spawn_component_supervisor(
            "prober",
            initial_backoff,
            max_backoff,
            MAX_RESTARTS,
            move || {
                let monitor = Arc::clone(&monitor);
                async move {
                    health::mark_component_ok("prober");
                    crate::platform::operator::run_prober(
                        monitor,
                        Duration::from_secs(probe_interval),
                    )
                    .await
                }
            },
        ));
    } else {
        tracing::info!("operator.probe_interval_secs = 0; active prober disabled");
    }

    handles
}
