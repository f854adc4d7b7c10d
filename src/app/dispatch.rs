use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;

use crate::Config;
use crate::app::services::{Services, load_registry};
use crate::core::capabilities::CapabilityRegistry;
use crate::core::planner::{Goal, Plan};

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            if port == 0 {
                info!("Starting agicore on {host} (random port)");
            } else {
                info!("Starting agicore on {host}:{port}");
            }
            crate::platform::daemon::run(Arc::clone(&config), host, port).await
        }

        Commands::Plan {
            goal,
            constraints,
            execute,
        } => {
            let services = Services::from_config(Arc::clone(&config))?;
            let goal = constraints
                .into_iter()
                .fold(Goal::new(goal), Goal::with_constraint);
            let plan = run_plan(&services, &goal, execute).await?;
            let rendered = serde_json::to_string_pretty(&plan).context("serialize plan")?;
            println!("{rendered}");
            Ok(())
        }

        Commands::Capabilities => {
            let registry = load_registry(&config)?;
            print!("{}", render_capabilities(&registry));
            Ok(())
        }

        Commands::Config => {
            println!("Config: {}", config.config_path.display());
            println!();
            print!("{}", toml::to_string_pretty(config.as_ref()).context("serialize config")?);
            Ok(())
        }
    }
}

/// Decompose `goal`, optionally execute it, and return the stored plan.
async fn run_plan(services: &Services, goal: &Goal, execute: bool) -> Result<Plan> {
    let plan = services.create_plan(goal)?;
    if !execute {
        return Ok(plan);
    }

    let status = services.executor.execute(&plan.id).await?;
    info!(plan_id = %plan.id, %status, "Plan run finished");
    services
        .plans
        .get(&plan.id)
        .with_context(|| format!("plan {} vanished from the store", plan.id))
}

fn render_capabilities(registry: &CapabilityRegistry) -> String {
    let mut out = String::new();
    for worker in registry.workers() {
        let _ = writeln!(out, "{worker}");
        for action in registry.actions(worker) {
            let Some(spec) = registry.capability(worker, action) else {
                continue;
            };
            let _ = write!(out, "  {action:<18} {}", spec.description);
            if let Some(compensation) = &spec.compensation {
                let _ = write!(out, " (undo: {compensation})");
            }
            out.push('\n');
        }
    }
    out
}
