use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::datetime;
use crate::observe::{Observable, Subscription, Versioned};
use crate::store::{StoreError, TaskStore};
use crate::task::{InvalidTask, Task, TaskId};

#[derive(Debug, thiserror::Error)]
pub enum TaskOpError {
    #[error("invalid task: {0}")]
    Invalid(#[from] InvalidTask),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("worker task failed: {0}")]
    Worker(String),
}

/// What the presentation layer renders: the selected day and its tasks,
/// plus the last failed operation, if any. A failure leaves the previous
/// task list in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayView {
    pub day: Option<NaiveDate>,
    pub tasks: Vec<Task>,
    pub last_error: Option<String>,
}

/// Mediates between presentation intents and the store. Store I/O runs on
/// the blocking worker pool; results come back through one observable
/// [`DayView`]. Each load carries a generation number, and a load that
/// finishes after a newer one has started discards its result instead of
/// publishing, so the visible list always belongs to the latest request.
///
/// Dropping an operation's future abandons it best-effort; a write already
/// handed to the worker pool still completes against the store.
pub struct TaskViewModel {
    store: Arc<TaskStore>,
    view: Observable<DayView>,
    load_generation: AtomicU64,
    selected_day: Mutex<Option<NaiveDate>>,
}

impl TaskViewModel {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self {
            store,
            view: Observable::new(DayView::default()),
            load_generation: AtomicU64::new(0),
            selected_day: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> Subscription<DayView> {
        self.view.subscribe()
    }

    pub fn latest(&self) -> Versioned<DayView> {
        self.view.latest()
    }

    pub fn selected_day(&self) -> Option<NaiveDate> {
        self.selected_day.lock().map(|day| *day).unwrap_or(None)
    }

    /// Makes `day` the selected day and publishes its tasks.
    /// Returns the queried tasks even when a newer load superseded this one.
    #[tracing::instrument(skip(self), fields(day = %datetime::format_day(day)))]
    pub async fn load_tasks_for_day(&self, day: NaiveDate) -> Result<Vec<Task>, TaskOpError> {
        let generation = self.begin_load(day);

        let store = Arc::clone(&self.store);
        let range = datetime::day_range(day);
        let result = run_on_worker(move || store.tasks_for_range(&range)).await;

        match result {
            Ok(tasks) => {
                if self.is_stale(generation) {
                    debug!(generation, "discarding superseded load");
                    return Ok(tasks);
                }
                self.view.publish(DayView {
                    day: Some(day),
                    tasks: tasks.clone(),
                    last_error: None,
                });
                Ok(tasks)
            }
            Err(err) => {
                if !self.is_stale(generation) {
                    self.publish_error(&err);
                }
                Err(err)
            }
        }
    }

    /// Validates and inserts a draft, then refreshes the visible day.
    /// Returns the id the store assigned.
    #[tracing::instrument(skip(self, task), fields(name = %task.name))]
    pub async fn add_task(&self, task: Task) -> Result<TaskId, TaskOpError> {
        if let Err(err) = task.validate() {
            let err = TaskOpError::from(err);
            self.publish_error(&err);
            return Err(err);
        }

        let task_day = task.day();
        let store = Arc::clone(&self.store);
        match run_on_worker(move || store.insert(task)).await {
            Ok(id) => {
                info!(id, "task added");
                self.refresh_after_mutation(task_day, "add").await;
                Ok(id)
            }
            Err(err) => {
                self.publish_error(&err);
                Err(err)
            }
        }
    }

    /// Overwrites a persisted task with new field values, then refreshes.
    #[tracing::instrument(skip(self, task), fields(id = ?task.id))]
    pub async fn update_task(&self, task: Task) -> Result<(), TaskOpError> {
        if let Err(err) = task.validate() {
            let err = TaskOpError::from(err);
            self.publish_error(&err);
            return Err(err);
        }

        let task_day = task.day();
        let store = Arc::clone(&self.store);
        match run_on_worker(move || store.update(&task)).await {
            Ok(()) => {
                self.refresh_after_mutation(task_day, "update").await;
                Ok(())
            }
            Err(err) => {
                self.publish_error(&err);
                Err(err)
            }
        }
    }

    /// Copy-with-new-fields edit of an already persisted task.
    pub async fn edit_task(
        &self,
        existing: &Task,
        name: impl Into<String>,
        description: impl Into<String>,
        date_start: NaiveDateTime,
        date_finish: NaiveDateTime,
    ) -> Result<(), TaskOpError> {
        let mut updated = existing.clone();
        updated.name = name.into();
        updated.description = description.into();
        updated.date_start = date_start;
        updated.date_finish = date_finish;
        self.update_task(updated).await
    }

    /// Removes the task's row, then refreshes the visible day.
    #[tracing::instrument(skip(self, task), fields(id = ?task.id))]
    pub async fn delete_task(&self, task: &Task) -> Result<(), TaskOpError> {
        let Some(id) = task.id else {
            let err = TaskOpError::Store(StoreError::MissingId);
            self.publish_error(&err);
            return Err(err);
        };

        let task_day = task.day();
        let store = Arc::clone(&self.store);
        match run_on_worker(move || store.delete(id)).await {
            Ok(()) => {
                info!(id, "task deleted");
                self.refresh_after_mutation(task_day, "delete").await;
                Ok(())
            }
            Err(err) => {
                self.publish_error(&err);
                Err(err)
            }
        }
    }

    /// Mutations refresh the currently selected day so the visible list
    /// keeps matching what the user is looking at; the mutated task's own
    /// day is only used when nothing has been selected yet. The write has
    /// already landed at this point, so a refresh failure is surfaced
    /// through the observable rather than failing the operation.
    async fn refresh_after_mutation(&self, task_day: NaiveDate, op: &str) {
        let day = self.selected_day().unwrap_or(task_day);
        if let Err(err) = self.load_tasks_for_day(day).await {
            warn!(op, error = %err, "refresh after mutation failed");
        }
    }

    /// Records the new selection and claims a load generation in one step,
    /// so the highest generation always belongs to the latest selected day.
    fn begin_load(&self, day: NaiveDate) -> u64 {
        match self.selected_day.lock() {
            Ok(mut selected) => {
                *selected = Some(day);
                self.load_generation.fetch_add(1, Ordering::SeqCst) + 1
            }
            Err(_) => self.load_generation.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.load_generation.load(Ordering::SeqCst) != generation
    }

    fn publish_error(&self, err: &TaskOpError) {
        warn!(error = %err, "surfacing failed operation");
        let mut view = self.view.latest().value;
        view.last_error = Some(err.to_string());
        self.view.publish(view);
    }
}

async fn run_on_worker<T, F>(job: F) -> Result<T, TaskOpError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result.map_err(TaskOpError::from),
        Err(err) => Err(TaskOpError::Worker(err.to_string())),
    }
}
