use super::monitor::HealthMonitor;
use super::types::ReportReceipt;
use anyhow::Result;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Probe every tracked service concurrently. Services that vanish between
/// listing and probing are skipped.
pub async fn probe_all(monitor: &HealthMonitor) -> Vec<ReportReceipt> {
    let services = monitor.tracked_services();
    let probes = services.iter().map(|service| monitor.active_probe(service));
    join_all(probes)
        .await
        .into_iter()
        .filter_map(|result| match result {
            Ok(receipt) => Some(receipt),
            Err(error) => {
                tracing::debug!("Skipping probe: {error}");
                None
            }
        })
        .collect()
}

/// Probe loop used by the daemon. Never returns on its own.
pub async fn run_prober(monitor: Arc<HealthMonitor>, every: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let receipts = probe_all(&monitor).await;
        let unhealthy = receipts
            .iter()
            .filter(|receipt| receipt.remediation.is_some())
            .count();
        tracing::debug!(probed = receipts.len(), unhealthy, "Probe sweep finished");
    }
}
