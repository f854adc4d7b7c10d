use super::traits::{DispatchFuture, DispatchGateway, DispatchRequest};
use crate::config::WorkerEndpoint;
use crate::error::DispatchError;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Action name that maps to the worker's `GET /health` endpoint.
pub const HEALTH_ACTION: &str = "health";

pub fn build_worker_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Reaches workers over HTTP/JSON.
///
/// `health` becomes `GET {base}/health`; every other action becomes
/// `POST {base}/{action-with-dashes}` with the parameters as the JSON body.
pub struct HttpDispatchGateway {
    client: Client,
    endpoints: BTreeMap<String, String>,
}

impl HttpDispatchGateway {
    pub fn new(endpoints: BTreeMap<String, String>) -> Self {
        Self {
            client: build_worker_client(),
            endpoints: endpoints
                .into_iter()
                .map(|(worker, base)| (worker, base.trim_end_matches('/').to_string()))
                .collect(),
        }
    }

    pub fn from_config(workers: &BTreeMap<String, WorkerEndpoint>) -> Self {
        Self::new(
            workers
                .iter()
                .map(|(worker, endpoint)| (worker.clone(), endpoint.base_url.clone()))
                .collect(),
        )
    }

    fn action_url(base: &str, action: &str) -> String {
        format!("{base}/{}", action.replace('_', "-"))
    }

    async fn send(
        &self,
        request: &DispatchRequest,
        timeout: Duration,
    ) -> Result<Value, DispatchError> {
        let Some(base) = self.endpoints.get(&request.worker_id) else {
            return Err(DispatchError::permanent(
                &request.worker_id,
                &request.action,
                "no endpoint configured for worker",
            ));
        };

        let url = Self::action_url(base, &request.action);
        let builder = if request.action == HEALTH_ACTION {
            self.client.get(&url)
        } else {
            self.client.post(&url).json(&request.parameters)
        };

        tracing::debug!(
            worker = request.worker_id.as_str(),
            action = request.action.as_str(),
            url = url.as_str(),
            "dispatching worker request"
        );

        let response = builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|error| classify_transport_error(request, &error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| classify_transport_error(request, &error))?;

        if !status.is_success() {
            return Err(classify_status(request, status, &body));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

impl DispatchGateway for HttpDispatchGateway {
    fn name(&self) -> &str {
        "http"
    }

    fn dispatch<'a>(
        &'a self,
        request: &'a DispatchRequest,
        timeout: Duration,
    ) -> DispatchFuture<'a> {
        Box::pin(self.send(request, timeout))
    }
}

/// 408, 429 and 5xx are worth retrying; every other non-success is not.
/// 401/403 in particular mean the worker's credentials are wrong, which no
/// retry will fix.
fn classify_status(request: &DispatchRequest, status: StatusCode, body: &str) -> DispatchError {
    let detail = error_detail(body);
    let message = if detail.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {detail}", status.as_u16())
    };

    let code = status.as_u16();
    if status.is_server_error() || code == 408 || code == 429 {
        DispatchError::transient(&request.worker_id, &request.action, message)
    } else {
        DispatchError::permanent(&request.worker_id, &request.action, message)
    }
}

fn classify_transport_error(request: &DispatchRequest, error: &reqwest::Error) -> DispatchError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        DispatchError::transient(&request.worker_id, &request.action, error.to_string())
    } else {
        DispatchError::permanent(&request.worker_id, &request.action, error.to_string())
    }
}

/// Workers answer errors as `{"detail": "..."}`; fall back to the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}
