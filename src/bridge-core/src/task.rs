// SPDX-License-Identifier: Apache-2.0

//! The task engine backing Redfish `TaskService`: long-running vSphere operations
//! are represented as polled tasks rather than blocking the HTTP request that started them.
//!
//! Drives every task through `New -> Starting -> Running -> Completed` on a fixed timer,
//! stepping `percent_complete` in place of observing real upstream progress (the bridge has no
//! granular progress signal from vCenter or from its own simulated firmware/RAID actions).
//! Per the "no observable task failure" design contract, a task whose underlying operation
//! failed still reaches `Completed`/`Warning` with a message recorded, rather than `Exception` —
//! the orchestrator this bridge serves treats any task failure as a hard inspection error.
//! `Exception` and `Cancelled` remain in [`TaskState`] for schema completeness (a `GET` on a
//! task must accept any DMTF-defined value) but this driver never produces them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::ids::TaskId;

/// Delay before a task moves from `New` to `Starting`.
const STARTING_DELAY: Duration = Duration::from_millis(100);
/// Delay before a task moves from `Starting` to `Running`.
const RUNNING_DELAY: Duration = Duration::from_millis(500);
/// Delay between each `percent_complete` step while `Running`.
const TICK_INTERVAL: Duration = Duration::from_millis(500);
/// Percentage gained per tick.
const TICK_STEP: u8 = 5;
/// How long a terminal task is retained in the registry before eviction.
const RETENTION_SECS: i64 = 60 * 60;

/// Lifecycle state of a [`Task`], matching Redfish's `TaskState` enum (DMTF schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TaskState {
    /// Queued but not yet running.
    New,
    /// Picked up by the driver, about to begin work.
    Starting,
    /// Currently executing.
    Running,
    /// Finished; see [`TaskStatus`] for whether the underlying operation actually succeeded.
    Completed,
    /// Finished with an unrecoverable error. Never produced by this driver — retained for
    /// schema completeness only (see module docs).
    Exception,
    /// Cancelled before completion. Never produced by this driver — no action exposed by this
    /// bridge's Redfish surface cancels an in-flight task.
    Cancelled,
}

/// Severity-tagged status, matching Redfish's `TaskStatus` health enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TaskStatus {
    /// No issues.
    Ok,
    /// Degraded but not failed — the underlying vSphere call hit `UpstreamUnavailable` and was
    /// deferred, per the soft-success policy.
    Warning,
    /// Failed. Never produced by this driver; see [`TaskState::Exception`].
    Critical,
}

/// A single human-readable progress message, mirrored into `Task.Messages[]`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskMessage {
    /// Registry-qualified message id, e.g. `"Base.1.0.Success"`.
    pub message_id: String,
    /// Rendered message text.
    pub message: String,
}

impl TaskMessage {
    fn info(text: impl Into<String>) -> Self {
        Self {
            message_id: "Base.1.0.Success".to_string(),
            message: text.into(),
        }
    }

    fn warning(text: impl Into<String>) -> Self {
        Self {
            message_id: "Base.1.0.PropertyValueModified".to_string(),
            message: text.into(),
        }
    }
}

/// A tracked asynchronous operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Task {
    /// Stable identifier, used in the `/redfish/v1/TaskService/Tasks/{id}` URI.
    pub id: TaskId,
    /// Human-readable name, e.g. `"Firmware Update"`.
    pub name: String,
    /// The resource this task operates on, e.g. `/redfish/v1/Systems/worker-1`.
    pub target_uri: String,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Current health status.
    pub status: TaskStatus,
    /// Percent complete, 0-100; non-decreasing for the lifetime of the task.
    pub percent_complete: u8,
    /// Accumulated progress/result messages, oldest first.
    pub messages: Vec<TaskMessage>,
    /// When the task was created.
    pub start_time: DateTime<Utc>,
    /// When the task reached a terminal state, if it has.
    pub end_time: Option<DateTime<Utc>>,
}

impl Task {
    fn new(id: TaskId, name: String, target_uri: String) -> Self {
        Self {
            id,
            name,
            target_uri,
            state: TaskState::New,
            status: TaskStatus::Ok,
            percent_complete: 0,
            messages: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    fn mark_starting(&mut self) {
        self.state = TaskState::Starting;
    }

    fn mark_running(&mut self) {
        self.state = TaskState::Running;
    }

    /// Advances `percent_complete` by one tick, capped at 100. Returns the new value.
    fn step(&mut self) -> u8 {
        self.percent_complete = self.percent_complete.saturating_add(TICK_STEP).min(100);
        self.percent_complete
    }

    fn mark_completed(&mut self, status: TaskStatus, message: Option<String>) {
        self.state = TaskState::Completed;
        self.status = status;
        self.percent_complete = 100;
        self.end_time = Some(Utc::now());
        if let Some(message) = message {
            match status {
                TaskStatus::Ok => self.messages.push(TaskMessage::info(message)),
                _ => self.messages.push(TaskMessage::warning(message)),
            }
        }
    }

    /// True once [`Task::end_time`] has aged past the retention window.
    fn evictable(&self) -> bool {
        match self.end_time {
            Some(end) => Utc::now().signed_duration_since(end).num_seconds() >= RETENTION_SECS,
            None => false,
        }
    }
}

/// The result of running a task's work closure.
pub enum TaskOutcome {
    /// The operation completed normally; carries the success message recorded on the task.
    Success(String),
    /// The operation could not complete (typically `UpstreamUnavailable`) but the task still
    /// reports `Completed`/`Warning`, per the no-observable-task-failure contract.
    Degraded(String),
}

/// A boxed, `Send` future producing a [`TaskOutcome`].
pub type BoxFuture = std::pin::Pin<Box<dyn std::future::Future<Output = TaskOutcome> + Send>>;

/// Registry of in-flight and completed tasks, with a bounded retention window.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, Arc<Mutex<Task>>>>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new task in the `New` state and spawns `work` to drive it through
    /// `Starting -> Running -> Completed`. Returns the task id immediately; the caller (a
    /// Redfish Action handler) responds with `202 Accepted` and a `Location` header pointing at
    /// the task's monitor URI.
    pub async fn spawn(
        &self,
        name: impl Into<String>,
        target_uri: impl Into<String>,
        work: impl FnOnce() -> BoxFuture + Send + 'static,
    ) -> TaskId {
        let id = TaskId::new();
        let task = Arc::new(Mutex::new(Task::new(id.clone(), name.into(), target_uri.into())));
        self.tasks.write().await.insert(id.clone(), task.clone());
        tokio::spawn(drive(task, work));
        id
    }

    /// Registers and immediately completes a task — used to seed the historical task set shown
    /// on an orchestrator's first `TaskService/Tasks` poll.
    pub async fn seed_completed(&self, name: impl Into<String>, target_uri: impl Into<String>) -> TaskId {
        let id = TaskId::new();
        let mut task = Task::new(id.clone(), name.into(), target_uri.into());
        task.mark_completed(TaskStatus::Ok, Some("Operation completed".to_string()));
        self.tasks.write().await.insert(id.clone(), Arc::new(Mutex::new(task)));
        id
    }

    /// Returns a snapshot of the task with the given id, if it exists.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        let tasks = self.tasks.read().await;
        match tasks.get(id) {
            Some(task) => Some(task.lock().await.clone()),
            None => None,
        }
    }

    /// Returns snapshots of every tracked task, for `TaskService/Tasks` collection listing.
    pub async fn list(&self) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut out = Vec::with_capacity(tasks.len());
        for task in tasks.values() {
            out.push(task.lock().await.clone());
        }
        out
    }

    /// Evicts every task whose `end_time` is older than the retention window.
    pub async fn evict_expired(&self) -> usize {
        let mut tasks = self.tasks.write().await;
        let mut evicted = Vec::new();
        for (id, task) in tasks.iter() {
            if task.lock().await.evictable() {
                evicted.push(id.clone());
            }
        }
        for id in &evicted {
            tasks.remove(id);
        }
        evicted.len()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn drive(task: Arc<Mutex<Task>>, work: impl FnOnce() -> BoxFuture + Send + 'static) {
    tokio::time::sleep(STARTING_DELAY).await;
    task.lock().await.mark_starting();

    tokio::time::sleep(RUNNING_DELAY).await;
    task.lock().await.mark_running();

    let outcome = work().await;

    loop {
        let percent = task.lock().await.step();
        if percent >= 100 {
            break;
        }
        tokio::time::sleep(TICK_INTERVAL).await;
    }

    let mut guard = task.lock().await;
    match outcome {
        TaskOutcome::Success(message) => guard.mark_completed(TaskStatus::Ok, Some(message)),
        TaskOutcome::Degraded(message) => guard.mark_completed(TaskStatus::Warning, Some(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawned_task_transitions_through_the_lifecycle_to_completed() {
        let registry = TaskRegistry::new();
        let id = registry
            .spawn("Firmware Update", "/redfish/v1/UpdateService", || {
                Box::pin(async { TaskOutcome::Success("update applied".to_string()) })
            })
            .await;

        let mut seen_running = false;
        let mut last_percent = 0u8;
        loop {
            let task = registry.get(&id).await.unwrap();
            assert!(task.percent_complete >= last_percent, "percent_complete must never decrease");
            last_percent = task.percent_complete;
            if task.state == TaskState::Running {
                seen_running = true;
            }
            if task.state == TaskState::Completed {
                assert_eq!(task.percent_complete, 100);
                assert_eq!(task.status, TaskStatus::Ok);
                assert!(task.end_time.is_some());
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(seen_running, "task should observably pass through Running");
    }

    #[tokio::test]
    async fn degraded_outcome_still_completes_ok_surface() {
        let registry = TaskRegistry::new();
        let id = registry
            .spawn("Simple Update", "/redfish/v1/UpdateService", || {
                Box::pin(async { TaskOutcome::Degraded("Upstream unavailable; operation deferred.".to_string()) })
            })
            .await;

        loop {
            let task = registry.get(&id).await.unwrap();
            if task.state == TaskState::Completed {
                assert_eq!(task.status, TaskStatus::Warning);
                assert!(task.messages.iter().any(|m| m.message.contains("deferred")));
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn unknown_task_id_returns_none() {
        let registry = TaskRegistry::new();
        assert!(registry.get(&TaskId::new()).await.is_none());
    }

    #[tokio::test]
    async fn seeded_completed_task_is_immediately_visible() {
        let registry = TaskRegistry::new();
        let id = registry.seed_completed("Historical Update", "/redfish/v1/UpdateService").await;
        let task = registry.get(&id).await.unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.percent_complete, 100);
    }

    #[tokio::test]
    async fn list_includes_every_tracked_task() {
        let registry = TaskRegistry::new();
        registry.seed_completed("a", "/redfish/v1/Systems/worker-1").await;
        registry.seed_completed("b", "/redfish/v1/Systems/worker-2").await;
        assert_eq!(registry.list().await.len(), 2);
    }
}
