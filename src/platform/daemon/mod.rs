use crate::app::services::Services;
use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

mod supervisor;

use supervisor::spawn_supervised_components;

const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

/// Long-running orchestrator: tracked services are seeded, the gateway and
/// the optional prober run under supervision until Ctrl-C.
pub async fn run(config: Arc<Config>, host: String, port: u16) -> Result<()> {
    let services = Arc::new(Services::from_config(Arc::clone(&config))?);
    services.seed_tracked_services();

    crate::diagnostics::health::mark_component_ok("daemon");

    let handles: Vec<JoinHandle<()>> = spawn_supervised_components(
        &services,
        host.clone(),
        port,
        INITIAL_BACKOFF_SECS,
        MAX_BACKOFF_SECS,
    );

    println!("◆ agicore daemon started");
    println!("   Gateway:  http://{host}:{port}");
    println!(
        "   Tracking: {}",
        services.monitor.tracked_services().join(", ")
    );
    println!("   Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    crate::diagnostics::health::mark_component_error("daemon", "shutdown requested");
    services.observer.flush();

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}
