use super::types::{HealthStatus, ServiceHealthRecord};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Latest known health of every tracked service.
///
/// Each record sits behind its own lock; the map lock is only taken to find or
/// add a service.
#[derive(Default)]
pub struct HealthStore {
    records: RwLock<BTreeMap<String, Arc<Mutex<ServiceHealthRecord>>>>,
}

impl HealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, service_name: &str) -> Option<Arc<Mutex<ServiceHealthRecord>>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_name)
            .cloned()
    }

    fn cell_or_insert(&self, service_name: &str) -> (Arc<Mutex<ServiceHealthRecord>>, bool) {
        if let Some(cell) = self.cell(service_name) {
            return (cell, false);
        }
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = records.get(service_name) {
            return (Arc::clone(cell), false);
        }
        let cell = Arc::new(Mutex::new(ServiceHealthRecord::new(
            service_name,
            HealthStatus::Healthy,
            "registered",
        )));
        records.insert(service_name.to_string(), Arc::clone(&cell));
        (cell, true)
    }

    /// Start tracking a service as healthy. Returns the record and whether it
    /// was newly added; an already tracked service is left untouched.
    pub fn register(&self, service_name: &str) -> (ServiceHealthRecord, bool) {
        let (cell, created) = self.cell_or_insert(service_name);
        let record = cell.lock().unwrap_or_else(PoisonError::into_inner).clone();
        (record, created)
    }

    pub fn upsert(
        &self,
        service_name: &str,
        status: HealthStatus,
        details: impl Into<String>,
    ) -> ServiceHealthRecord {
        let (cell, _) = self.cell_or_insert(service_name);
        let mut record = cell.lock().unwrap_or_else(PoisonError::into_inner);
        record.status = status;
        record.details = details.into();
        record.last_updated = Utc::now();
        record.clone()
    }

    pub fn get(&self, service_name: &str) -> Option<ServiceHealthRecord> {
        self.cell(service_name)
            .map(|cell| cell.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    pub fn contains(&self, service_name: &str) -> bool {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(service_name)
    }

    pub fn service_names(&self) -> Vec<String> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Every record, ordered by service name.
    pub fn list(&self) -> Vec<ServiceHealthRecord> {
        let cells: Vec<_> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        cells
            .iter()
            .map(|cell| cell.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }
}
