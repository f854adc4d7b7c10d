//! Process-wide liveness of the orchestrator's own components (gateway,
//! prober, daemon). Worker health lives in `platform::operator`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{OnceLock, PoisonError, RwLock};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComponentStatus {
    Starting,
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub updated_at: DateTime<Utc>,
    pub last_ok: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub restart_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentSnapshot {
    pub pid: u32,
    pub uptime_seconds: u64,
    pub components: BTreeMap<String, ComponentHealth>,
}

struct ComponentRegistry {
    started_at: Instant,
    components: RwLock<BTreeMap<String, ComponentHealth>>,
}

static REGISTRY: OnceLock<ComponentRegistry> = OnceLock::new();

fn registry() -> &'static ComponentRegistry {
    REGISTRY.get_or_init(|| ComponentRegistry {
        started_at: Instant::now(),
        components: RwLock::new(BTreeMap::new()),
    })
}

fn upsert(component: &str, update: impl FnOnce(&mut ComponentHealth, DateTime<Utc>)) {
    let now = Utc::now();
    let mut map = registry()
        .components
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let entry = map
        .entry(component.to_string())
        .or_insert_with(|| ComponentHealth {
            status: ComponentStatus::Starting,
            updated_at: now,
            last_ok: None,
            last_error: None,
            restart_count: 0,
        });
    update(entry, now);
    entry.updated_at = now;
}

pub fn mark_component_ok(component: &str) {
    upsert(component, |entry, now| {
        entry.status = ComponentStatus::Ok;
        entry.last_ok = Some(now);
        entry.last_error = None;
    });
}

#[allow(clippy::needless_pass_by_value)]
pub fn mark_component_error(component: &str, error: impl ToString) {
    let error = error.to_string();
    upsert(component, move |entry, _| {
        entry.status = ComponentStatus::Error;
        entry.last_error = Some(error);
    });
}

pub fn bump_component_restart(component: &str) {
    upsert(component, |entry, _| {
        entry.restart_count = entry.restart_count.saturating_add(1);
    });
}

pub fn snapshot() -> ComponentSnapshot {
    let components = registry()
        .components
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    ComponentSnapshot {
        pid: std::process::id(),
        uptime_seconds: registry().started_at.elapsed().as_secs(),
        components,
    }
}
