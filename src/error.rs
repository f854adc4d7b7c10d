use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `agicore`.
///
/// Each subsystem defines its own error enum. Callers (the HTTP gateway, the
/// CLI) match on these to pick a status code or exit message; the binary edge
/// still uses `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum AgicoreError {
    // ── Planning / saga execution ───────────────────────────────────────
    #[error("planner: {0}")]
    Planner(#[from] PlannerError),

    // ── Worker boundary ─────────────────────────────────────────────────
    #[error("dispatch: {0}")]
    Dispatch(#[from] DispatchError),

    // ── Health / remediation ────────────────────────────────────────────
    #[error("health: {0}")]
    Health(#[from] HealthError),

    // ── Config ──────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Planner errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no registered worker offers action {action}")]
    CapabilityUnavailable { action: String },

    #[error("plan not found: {0}")]
    PlanNotFound(String),

    #[error("plan {plan_id} cannot be executed from status {status}")]
    InvalidPlanState { plan_id: String, status: String },

    #[error("plan {0} already completed and cannot be cancelled")]
    PlanNotCancellable(String),
}

// ─── Dispatch errors ─────────────────────────────────────────────────────────

/// Failure at the worker boundary.
///
/// `Transient` failures are worth retrying (timeouts, 5xx, throttling);
/// `Permanent` failures are not (bad input, missing worker, rejected
/// credentials).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("worker {worker} action {action} failed transiently: {message}")]
    Transient {
        worker: String,
        action: String,
        message: String,
    },

    #[error("worker {worker} action {action} failed permanently: {message}")]
    Permanent {
        worker: String,
        action: String,
        message: String,
    },
}

impl DispatchError {
    pub fn transient(
        worker: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transient {
            worker: worker.into(),
            action: action.into(),
            message: message.into(),
        }
    }

    pub fn permanent(
        worker: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Permanent {
            worker: worker.into(),
            action: action.into(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Reclassify as permanent, keeping the message. Used once retries run out.
    pub fn into_permanent(self) -> Self {
        match self {
            Self::Transient {
                worker,
                action,
                message,
            } => Self::Permanent {
                worker,
                action,
                message: format!("retries exhausted: {message}"),
            },
            permanent @ Self::Permanent { .. } => permanent,
        }
    }
}

// ─── Health errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("service '{0}' not tracked")]
    ServiceNotTracked(String),

    #[error("invalid health report: {0}")]
    InvalidReport(String),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, AgicoreError>;
