use super::store::HealthStore;
use super::types::{HealthStatus, QueueOutcome, RemediationEvent, RemediationStatus, RemediationTask};
use crate::core::dispatch::{DispatchGateway, DispatchRequest, dispatch_bounded};
use crate::runtime::observability::{NoopObserver, Observer, ObserverEvent, ObserverMetric};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

type TaskSlot = Arc<Mutex<Option<RemediationTask>>>;

/// Runs recovery actions against unhealthy services, one at a time per service.
///
/// Each service has its own slot holding its current or most recent task. A
/// new task only replaces a slot whose task has finished. The map lock is only
/// taken to find or add a slot.
pub struct RemediationEngine {
    slots: RwLock<HashMap<String, TaskSlot>>,
    health: Arc<HealthStore>,
    gateway: Arc<dyn DispatchGateway>,
    timeout: Duration,
    observer: Arc<dyn Observer>,
    events: broadcast::Sender<RemediationEvent>,
}

impl RemediationEngine {
    pub fn new(
        health: Arc<HealthStore>,
        gateway: Arc<dyn DispatchGateway>,
        timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            slots: RwLock::new(HashMap::new()),
            health,
            gateway,
            timeout,
            observer: Arc::new(NoopObserver),
            events,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Stream of lifecycle events for every task queued after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<RemediationEvent> {
        self.events.subscribe()
    }

    fn slot(&self, service_name: &str) -> Option<TaskSlot> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_name)
            .cloned()
    }

    fn slot_or_insert(&self, service_name: &str) -> TaskSlot {
        if let Some(slot) = self.slot(service_name) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(service_name.to_string()).or_default())
    }

    /// Current or most recent task for a service.
    pub fn task(&self, service_name: &str) -> Option<RemediationTask> {
        self.slot(service_name)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn tasks(&self) -> Vec<RemediationTask> {
        let slots: Vec<TaskSlot> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut tasks: Vec<_> = slots
            .iter()
            .filter_map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect();
        tasks.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        tasks
    }

    pub fn in_flight(&self) -> usize {
        self.tasks()
            .iter()
            .filter(|task| task.status.is_active())
            .count()
    }

    /// Queue `action` for `service_name` unless a task is already queued or
    /// running for it, in which case that task is returned instead.
    ///
    /// Must be called from within a tokio runtime; the task runs in the
    /// background and this returns as soon as it is registered.
    pub fn queue(self: &Arc<Self>, service_name: &str, action: &str) -> QueueOutcome {
        let slot = self.slot_or_insert(service_name);
        let task = {
            let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = current.as_ref()
                && existing.status.is_active()
            {
                tracing::debug!(
                    service = service_name,
                    task_id = existing.task_id.as_str(),
                    "Remediation already in flight"
                );
                return QueueOutcome::AlreadyInFlight(existing.clone());
            }
            let task = RemediationTask::queued(service_name, action);
            *current = Some(task.clone());
            task
        };

        tracing::info!(
            service = service_name,
            action,
            task_id = task.task_id.as_str(),
            "Remediation queued"
        );
        self.observer.record_event(&ObserverEvent::RemediationQueued {
            service: task.service_name.clone(),
            task_id: task.task_id.clone(),
            action: task.action.clone(),
        });
        self.record_in_flight();
        self.publish(RemediationEvent::Queued(task.clone()));

        let engine = Arc::clone(self);
        let queued = task.clone();
        tokio::spawn(async move { engine.run(queued).await });

        QueueOutcome::Queued(task)
    }

    async fn run(&self, task: RemediationTask) {
        let Some(started) = self.update_task(&task, |task| {
            task.status = RemediationStatus::Running;
            task.started_at = Some(Utc::now());
        }) else {
            return;
        };
        self.observer.record_event(&ObserverEvent::RemediationStarted {
            service: started.service_name.clone(),
            task_id: started.task_id.clone(),
        });
        self.publish(RemediationEvent::Started(started));

        let request = DispatchRequest::new(&task.service_name, &task.action)
            .with_parameter("service_name", task.service_name.as_str());
        let result = dispatch_bounded(self.gateway.as_ref(), &request, self.timeout).await;

        match result {
            Ok(_) => {
                // The record and the task flip under the same slot lock, so a
                // report that lands after the record turns healthy queues a
                // fresh task instead of being absorbed by this one.
                let mut recovered = None;
                let done = self.update_task(&task, |task| {
                    recovered = Some(self.health.upsert(
                        &task.service_name,
                        HealthStatus::Healthy,
                        format!("recovered by remediation action '{}'", task.action),
                    ));
                    task.status = RemediationStatus::Succeeded;
                    task.completed_at = Some(Utc::now());
                });
                if let Some(record) = recovered {
                    self.observer.record_event(&ObserverEvent::HealthUpdated {
                        service: record.service_name,
                        status: record.status,
                    });
                }
                if let Some(done) = done {
                    tracing::info!(
                        service = done.service_name.as_str(),
                        task_id = done.task_id.as_str(),
                        "Remediation succeeded"
                    );
                    self.observer.record_event(&ObserverEvent::RemediationSucceeded {
                        service: done.service_name.clone(),
                        task_id: done.task_id.clone(),
                    });
                    self.record_in_flight();
                    self.publish(RemediationEvent::Succeeded(done));
                }
            }
            Err(error) => {
                let message = error.to_string();
                if let Some(done) = self.update_task(&task, |task| {
                    task.status = RemediationStatus::Failed;
                    task.completed_at = Some(Utc::now());
                    task.error = Some(message.clone());
                }) {
                    tracing::warn!(
                        service = done.service_name.as_str(),
                        task_id = done.task_id.as_str(),
                        "Remediation failed: {message}"
                    );
                    self.observer.record_event(&ObserverEvent::RemediationFailed {
                        service: done.service_name.clone(),
                        task_id: done.task_id.clone(),
                        error: message,
                    });
                    self.record_in_flight();
                    self.publish(RemediationEvent::Failed(done));
                }
            }
        }
    }

    /// Apply `f` to the slot if it still holds `task`.
    fn update_task(
        &self,
        task: &RemediationTask,
        f: impl FnOnce(&mut RemediationTask),
    ) -> Option<RemediationTask> {
        let slot = self.slot(&task.service_name)?;
        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let current = current
            .as_mut()
            .filter(|current| current.task_id == task.task_id)?;
        f(current);
        Some(current.clone())
    }

    fn publish(&self, event: RemediationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn record_in_flight(&self) {
        let count = u64::try_from(self.in_flight()).unwrap_or(u64::MAX);
        self.observer
            .record_metric(&ObserverMetric::RemediationsInFlight(count));
    }
}
