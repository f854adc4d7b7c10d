use super::traits::{DispatchGateway, DispatchRequest};
use crate::config::SagaConfig;
use crate::error::DispatchError;
use serde_json::Value;
use std::time::Duration;

/// Bounded exponential backoff for transient dispatch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// Wall-clock bound on each individual attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &SagaConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms.max(config.base_backoff_ms)),
            timeout: Duration::from_secs(config.dispatch_timeout_secs.max(1)),
        }
    }

    /// Same timing, but at most one retry. Used for compensation.
    pub fn single_retry(self) -> Self {
        Self {
            max_retries: self.max_retries.min(1),
            ..self
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SagaConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub result: Result<Value, DispatchError>,
    pub attempts: u32,
}

/// Single attempt, bounded by `timeout` even if the gateway ignores it.
pub async fn dispatch_bounded(
    gateway: &dyn DispatchGateway,
    request: &DispatchRequest,
    timeout: Duration,
) -> Result<Value, DispatchError> {
    match tokio::time::timeout(timeout, gateway.dispatch(request, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(DispatchError::transient(
            &request.worker_id,
            &request.action,
            format!("timed out after {}ms", timeout.as_millis()),
        )),
    }
}

/// Dispatch with transient-error retries. A transient error that survives every
/// retry is returned as permanent.
pub async fn dispatch_with_retry(
    gateway: &dyn DispatchGateway,
    request: &DispatchRequest,
    policy: &RetryPolicy,
) -> DispatchOutcome {
    let mut attempts = 0;

    loop {
        attempts += 1;
        match dispatch_bounded(gateway, request, policy.timeout).await {
            Ok(value) => {
                if attempts > 1 {
                    tracing::info!(
                        worker = request.worker_id.as_str(),
                        action = request.action.as_str(),
                        attempts,
                        "Worker recovered after retries"
                    );
                }
                return DispatchOutcome {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(error) if !error.is_transient() => {
                return DispatchOutcome {
                    result: Err(error),
                    attempts,
                };
            }
            Err(error) => {
                let retry = attempts - 1;
                if retry >= policy.max_retries {
                    tracing::warn!(
                        worker = request.worker_id.as_str(),
                        action = request.action.as_str(),
                        attempts,
                        "Transient failures exhausted retries: {error}"
                    );
                    return DispatchOutcome {
                        result: Err(error.into_permanent()),
                        attempts,
                    };
                }

                let delay = policy.backoff_for(retry);
                tracing::warn!(
                    worker = request.worker_id.as_str(),
                    action = request.action.as_str(),
                    attempt = attempts,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Dispatch failed transiently, retrying: {error}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
