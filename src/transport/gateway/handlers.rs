use super::{AppState, CreatePlanBody, ExecuteQuery};
use crate::core::planner::{Goal, PlanStatus};
use crate::diagnostics::health;
use crate::error::{HealthError, PlannerError};
use crate::platform::operator::HealthReport;
use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

/// Error body shared by every route.
#[derive(Debug)]
pub(super) struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"error": self.kind, "message": self.message})),
        )
            .into_response()
    }
}

impl From<PlannerError> for ApiError {
    fn from(error: PlannerError) -> Self {
        let (status, kind) = match &error {
            PlannerError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            PlannerError::CapabilityUnavailable { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "capability_unavailable")
            }
            PlannerError::PlanNotFound(_) => (StatusCode::NOT_FOUND, "plan_not_found"),
            PlannerError::InvalidPlanState { .. } => (StatusCode::CONFLICT, "invalid_plan_state"),
            PlannerError::PlanNotCancellable(_) => (StatusCode::CONFLICT, "plan_not_cancellable"),
        };
        Self::new(status, kind, error.to_string())
    }
}

impl From<HealthError> for ApiError {
    fn from(error: HealthError) -> Self {
        let (status, kind) = match &error {
            HealthError::ServiceNotTracked(_) => (StatusCode::NOT_FOUND, "service_not_tracked"),
            HealthError::InvalidReport(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        };
        Self::new(status, kind, error.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "validation_error",
            rejection.body_text(),
        )
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn plan_status_body(plan_id: &str, status: PlanStatus) -> Json<serde_json::Value> {
    Json(json!({"plan_id": plan_id, "status": status}))
}

/// GET /health: orchestrator liveness plus a component snapshot
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let services = &state.services;
    Json(json!({
        "status": "ok",
        "service": "agicore",
        "version": env!("CARGO_PKG_VERSION"),
        "plans": services.plans.len(),
        "tracked_services": services.monitor.tracked_services().len(),
        "remediations_in_flight": services.remediation.in_flight(),
        "runtime": health::snapshot(),
    }))
}

/// POST /plans
pub(super) async fn handle_create_plan(
    State(state): State<AppState>,
    body: Result<Json<CreatePlanBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    let goal = Goal {
        description: body.description,
        constraints: body.constraints,
    };
    let plan = state.services.create_plan(&goal)?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /plans/{id}
pub(super) async fn handle_get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let plan = state
        .services
        .plans
        .get(&plan_id)
        .ok_or(PlannerError::PlanNotFound(plan_id))?;
    Ok(Json(plan))
}

/// POST /plans/{id}/execute
pub(super) async fn handle_execute_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    Query(query): Query<ExecuteQuery>,
) -> ApiResult<Response> {
    let executor = &state.services.executor;

    if query.wait == Some(false) {
        executor.spawn_execute(&plan_id)?;
        let status = state
            .services
            .plans
            .get(&plan_id)
            .map_or(PlanStatus::Pending, |plan| plan.status);
        return Ok((StatusCode::ACCEPTED, plan_status_body(&plan_id, status)).into_response());
    }

    // The run belongs to the runtime; a timed-out or disconnected request
    // only stops waiting for it.
    let status = executor.spawn_execute(&plan_id)?.await.map_err(|error| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "execution_aborted",
            format!("plan {plan_id} execution task ended abnormally: {error}"),
        )
    })??;
    Ok(plan_status_body(&plan_id, status).into_response())
}

/// POST /plans/{id}/cancel
pub(super) async fn handle_cancel_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let status = state.services.executor.cancel(&plan_id).await?;
    Ok(plan_status_body(&plan_id, status))
}

/// POST /operator/reports
pub(super) async fn handle_report(
    State(state): State<AppState>,
    body: Result<Json<HealthReport>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(report) = body?;
    let receipt = state.services.monitor.receive_report(report)?;
    Ok(Json(receipt))
}

/// POST /operator/services/{name}/probe
pub(super) async fn handle_probe_service(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let receipt = state.services.monitor.active_probe(&service_name).await?;
    Ok(Json(receipt.record))
}

/// GET /operator/services/{name}
pub(super) async fn handle_get_service(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.monitor.record(&service_name)?))
}

/// GET /operator/services
pub(super) async fn handle_list_services(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.services.monitor.records())
}

/// GET /operator/remediation/{name}
pub(super) async fn handle_get_remediation(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let task = state.services.remediation.task(&service_name).ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "remediation_not_found",
            format!("no remediation recorded for service '{service_name}'"),
        )
    })?;
    Ok(Json(task))
}
