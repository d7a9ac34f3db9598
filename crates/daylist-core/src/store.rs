use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::datetime::DayRange;
use crate::observe::{Observable, Subscription};
use crate::task::{Task, TaskId};

const TASKS_FILE: &str = "tasks.data";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed parsing {} line {}: {}", file.display(), line, source)]
    Corrupt {
        file: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    #[error("failed encoding task row: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("task has no id yet")]
    MissingId,
    #[error("store lock poisoned")]
    Poisoned,
}

/// The task table: one JSONL file inside a data directory. Mutations are a
/// load-modify-save cycle behind a lock; saves go through a temp file in the
/// same directory and land with an atomic rename, so readers never see a
/// partially written table.
#[derive(Debug)]
pub struct TaskStore {
    data_dir: PathBuf,
    tasks_path: PathBuf,
    write_lock: Mutex<()>,
    changes: Observable<Vec<Task>>,
}

impl TaskStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let tasks_path = data_dir.join(TASKS_FILE);
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")?;
        }

        let initial = load_jsonl(&tasks_path)?;
        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            count = initial.len(),
            "opened task store"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            write_lock: Mutex::new(()),
            changes: Observable::new(initial),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[tracing::instrument(skip(self))]
    pub fn all_tasks(&self) -> Result<Vec<Task>, StoreError> {
        load_jsonl(&self.tasks_path)
    }

    #[tracing::instrument(skip(self, range))]
    pub fn tasks_for_range(&self, range: &DayRange) -> Result<Vec<Task>, StoreError> {
        let matched: Vec<Task> = self
            .all_tasks()?
            .into_iter()
            .filter(|task| range.contains(task.date_start))
            .collect();
        debug!(count = matched.len(), "queried day range");
        Ok(matched)
    }

    /// Live view of the whole table, re-published after every successful
    /// mutation. Dropping the subscription unsubscribes it.
    pub fn watch_all(&self) -> Subscription<Vec<Task>> {
        self.changes.subscribe()
    }

    /// Persists a draft under a freshly assigned id and returns that id.
    /// Any id already on the draft is ignored; the store owns id assignment.
    #[tracing::instrument(skip(self, task), fields(name = %task.name))]
    pub fn insert(&self, task: Task) -> Result<TaskId, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut tasks = self.all_tasks()?;
        let id = next_id(&tasks);
        let mut task = task;
        task.id = Some(id);
        tasks.push(task);
        self.save(&tasks)?;

        debug!(id, count = tasks.len(), "inserted task");
        Ok(id)
    }

    /// Overwrites the row carrying `task.id` with the given field values.
    #[tracing::instrument(skip(self, task), fields(id = ?task.id))]
    pub fn update(&self, task: &Task) -> Result<(), StoreError> {
        let id = task.id.ok_or(StoreError::MissingId)?;
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut tasks = self.all_tasks()?;
        let slot = tasks
            .iter_mut()
            .find(|row| row.id == Some(id))
            .ok_or(StoreError::NotFound(id))?;
        *slot = task.clone();
        self.save(&tasks)?;

        debug!(id, "updated task");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut tasks = self.all_tasks()?;
        let idx = tasks
            .iter()
            .position(|row| row.id == Some(id))
            .ok_or(StoreError::NotFound(id))?;
        tasks.remove(idx);
        self.save(&tasks)?;

        debug!(id, count = tasks.len(), "deleted task");
        Ok(())
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        save_jsonl_atomic(&self.tasks_path, tasks)?;
        self.changes.publish(tasks.to_vec());
        Ok(())
    }
}

fn next_id(tasks: &[Task]) -> TaskId {
    tasks.iter().filter_map(|t| t.id).max().unwrap_or(0) + 1
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> Result<Vec<Task>, StoreError> {
    debug!(file = %path.display(), "loading task table");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(trimmed).map_err(|source| StoreError::Corrupt {
            file: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        out.push(task);
    }

    debug!(count = out.len(), "loaded task table");
    Ok(out)
}

#[tracing::instrument(skip(path, tasks))]
fn save_jsonl_atomic(path: &Path, tasks: &[Task]) -> Result<(), StoreError> {
    debug!(file = %path.display(), count = tasks.len(), "saving task table atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path).map_err(|err| StoreError::Io(err.error))?;

    Ok(())
}
