//! Axum HTTP surface for plans and the operator.
//!
//! - JSON in and out; errors are `{"error": <kind>, "message": <text>}`
//! - Request body size limit (64KB max)
//! - Request timeout (120s by default); a plan run outlives the request that
//!   started it

mod handlers;
mod server;

pub use server::{build_app, run_gateway, run_gateway_with_listener};

use crate::app::services::Services;
use serde::Deserialize;
use std::sync::Arc;

/// Maximum request body size (64KB) -- prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Default request timeout; `[gateway] request_timeout_secs` overrides it
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

/// `POST /plans` body
#[derive(Debug, Deserialize)]
pub struct CreatePlanBody {
    pub description: String,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// `POST /plans/{id}/execute` query
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteQuery {
    /// `false` schedules the run and answers 202 right away
    pub wait: Option<bool>,
}
