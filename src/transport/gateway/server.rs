use super::handlers::{
    handle_cancel_plan, handle_create_plan, handle_execute_plan, handle_get_plan,
    handle_get_remediation, handle_get_service, handle_health, handle_list_services,
    handle_probe_service, handle_report,
};
use super::{AppState, MAX_BODY_SIZE};

use crate::app::services::Services;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Returns true when the bind address is not a loopback address.
fn is_public_bind(host: &str) -> bool {
    !matches!(
        host,
        "127.0.0.1" | "localhost" | "::1" | "[::1]" | "0:0:0:0:0:0:0:1"
    )
}

/// Bind `host:port` and serve until the listener fails.
pub async fn run_gateway(host: &str, port: u16, services: Arc<Services>) -> Result<()> {
    // ── Security: refuse public bind without explicit opt-in ──
    if is_public_bind(host) && !services.config.gateway.allow_public_bind {
        anyhow::bail!(
            "Refusing to bind to {host}: the orchestrator API has no authentication.\n\
             Fix: use --host 127.0.0.1 (default), or set\n\
             [gateway] allow_public_bind = true in config.toml (NOT recommended)."
        );
    }

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("parse gateway bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind gateway socket")?;

    run_gateway_with_listener(host, listener, services).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    host: &str,
    listener: tokio::net::TcpListener,
    services: Arc<Services>,
) -> Result<()> {
    let actual_port = listener
        .local_addr()
        .context("get gateway listener local address")?
        .port();
    print_gateway_banner(&format!("{host}:{actual_port}"));

    let timeout = Duration::from_secs(services.config.gateway.request_timeout_secs.max(1));
    let app = build_app(AppState { services }, timeout);
    crate::diagnostics::health::mark_component_ok("gateway");
    axum::serve(listener, app)
        .await
        .context("serve HTTP gateway")?;

    Ok(())
}

fn print_gateway_banner(display_addr: &str) {
    println!("Gateway listening on {display_addr}");
    println!("  GET  /health");
    println!("  POST /plans");
    println!("  GET  /plans/{{id}}");
    println!("  POST /plans/{{id}}/execute[?wait=false]");
    println!("  POST /plans/{{id}}/cancel");
    println!("  POST /operator/reports");
    println!("  GET  /operator/services[/{{name}}]");
    println!("  POST /operator/services/{{name}}/probe");
    println!("  GET  /operator/remediation/{{name}}");
}

pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/plans", post(handle_create_plan))
        .route("/plans/{id}", get(handle_get_plan))
        .route("/plans/{id}/execute", post(handle_execute_plan))
        .route("/plans/{id}/cancel", post(handle_cancel_plan))
        .route("/operator/reports", post(handle_report))
        .route("/operator/services", get(handle_list_services))
        .route("/operator/services/{name}", get(handle_get_service))
        .route("/operator/services/{name}/probe", post(handle_probe_service))
        .route("/operator/remediation/{name}", get(handle_get_remediation))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
}
