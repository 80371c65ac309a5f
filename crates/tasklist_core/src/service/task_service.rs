//! Task-list use-case service.
//!
//! # Responsibility
//! - Own the in-memory task collection and its id allocator.
//! - Run validation and sanitization before every mutation.
//! - Persist the whole collection after every successful mutation.
//!
//! # Invariants
//! - Validation failures leave the collection untouched.
//! - Persistence failures are reported after the in-memory mutation already
//!   happened; there is no rollback and no retry.
//! - Read APIs return snapshot copies, never the backing collection.
//! - Ids are unique within the live collection and never reused in a session.

use crate::model::task::{now_millis, Task, TaskFilter, TaskId, TaskStats};
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoError;
use crate::sanitize::sanitize;
use crate::validation::{
    validate_filter, validate_task_duplicate, validate_task_id, validate_task_text,
    ValidationError,
};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, TaskServiceError>;

/// Stable error category surfaced to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskErrorKind {
    TooShort,
    TooLong,
    Duplicate,
    InvalidId,
    NotFound,
    InvalidFilter,
    PersistenceError,
}

impl TaskErrorKind {
    /// Machine-readable code, stable across releases.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::Duplicate => "duplicate",
            Self::InvalidId => "invalid_id",
            Self::NotFound => "not_found",
            Self::InvalidFilter => "invalid_filter",
            Self::PersistenceError => "persistence_error",
        }
    }
}

impl Display for TaskErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ValidationError> for TaskErrorKind {
    fn from(value: &ValidationError) -> Self {
        match value {
            ValidationError::TooShort => Self::TooShort,
            ValidationError::TooLong => Self::TooLong,
            ValidationError::Duplicate => Self::Duplicate,
            ValidationError::InvalidId => Self::InvalidId,
            ValidationError::InvalidFilter(_) => Self::InvalidFilter,
        }
    }
}

/// Service error for task use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Input rejected before any mutation.
    Validation(ValidationError),
    /// No task carries the requested id.
    NotFound(TaskId),
    /// Saving the collection failed; in-memory state already changed.
    Persistence(RepoError),
}

impl TaskServiceError {
    pub fn kind(&self) -> TaskErrorKind {
        match self {
            Self::Validation(err) => TaskErrorKind::from(err),
            Self::NotFound(_) => TaskErrorKind::NotFound,
            Self::Persistence(_) => TaskErrorKind::PersistenceError,
        }
    }
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Persistence(err) => write!(f, "failed to save tasks: {err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<ValidationError> for TaskServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        Self::Persistence(value)
    }
}

/// Monotonic id source owned by the service.
///
/// Seeded past both the largest loaded id and the current epoch
/// milliseconds, so ids stay distinct across reloads even after the newest
/// task was removed.
#[derive(Debug, Clone)]
struct IdAllocator {
    next: TaskId,
}

impl IdAllocator {
    fn seeded(existing: &[Task], now_epoch_ms: TaskId) -> Self {
        let after_existing = existing
            .iter()
            .map(|task| task.id)
            .max()
            .and_then(|max| max.checked_add(1))
            .unwrap_or(1);
        Self {
            next: after_existing.max(now_epoch_ms).max(1),
        }
    }

    fn allocate(&mut self, in_use: &[Task]) -> TaskId {
        loop {
            let candidate = self.next;
            self.next = candidate.checked_add(1).unwrap_or(1);
            if !in_use.iter().any(|task| task.id == candidate) {
                return candidate;
            }
        }
    }
}

/// Task-list facade over a repository implementation.
pub struct TaskService<R: TaskRepository> {
    repo: R,
    tasks: Vec<Task>,
    ids: IdAllocator,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service and loads the persisted collection.
    ///
    /// A failed load is logged and the service starts empty; nothing is
    /// listening for faults yet at construction time.
    pub fn new(repo: R) -> Self {
        let tasks = match repo.load() {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(
                    "event=service_init module=service status=degraded error_code=load_failed error={err}"
                );
                Vec::new()
            }
        };
        let now_epoch_ms = TaskId::try_from(now_millis().timestamp_millis()).unwrap_or(1);
        let ids = IdAllocator::seeded(&tasks, now_epoch_ms);
        info!(
            "event=service_init module=service status=ok count={}",
            tasks.len()
        );

        Self { repo, tasks, ids }
    }

    /// Validates, sanitizes and appends a new pending task.
    ///
    /// # Contract
    /// - Length check runs before the duplicate check.
    /// - Stored text is `sanitize(text)`.
    pub fn add(&mut self, text: &str) -> ServiceResult<Task> {
        self.check("task_add", None, || {
            validate_task_text(text)?;
            validate_task_duplicate(text, &self.tasks)
        })?;

        let id = self.ids.allocate(&self.tasks);
        let task = Task::new(id, sanitize(text));
        self.tasks.push(task.clone());
        info!(
            "event=task_add module=service status=ok task_id={id} text_len={}",
            task.text.chars().count()
        );

        self.persist("task_add")?;
        Ok(task)
    }

    /// Removes the task with `id`. Returns `true` on success.
    pub fn remove(&mut self, id: TaskId) -> ServiceResult<bool> {
        self.check("task_remove", Some(id), || validate_task_id(id))?;

        let index = self.position(id, "task_remove")?;
        self.tasks.remove(index);
        info!("event=task_remove module=service status=ok task_id={id}");

        self.persist("task_remove")?;
        Ok(true)
    }

    /// Flips completion state of the task with `id`.
    pub fn toggle(&mut self, id: TaskId) -> ServiceResult<Task> {
        self.check("task_toggle", Some(id), || validate_task_id(id))?;

        let index = self.position(id, "task_toggle")?;
        let completed = self.tasks[index].toggle();
        let task = self.tasks[index].clone();
        info!("event=task_toggle module=service status=ok task_id={id} completed={completed}");

        self.persist("task_toggle")?;
        Ok(task)
    }

    /// Replaces the text of the task with `id`.
    ///
    /// No duplicate check runs here, so an edit may produce text equal to
    /// another task's text.
    pub fn edit(&mut self, id: TaskId, new_text: &str) -> ServiceResult<Task> {
        self.check("task_edit", Some(id), || {
            validate_task_id(id)?;
            validate_task_text(new_text)
        })?;

        let index = self.position(id, "task_edit")?;
        self.tasks[index].update_text(sanitize(new_text));
        let task = self.tasks[index].clone();
        info!(
            "event=task_edit module=service status=ok task_id={id} text_len={}",
            task.text.chars().count()
        );

        self.persist("task_edit")?;
        Ok(task)
    }

    /// Returns tasks selected by `filter`, in insertion order.
    pub fn list(&self, filter: TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    /// Resolves a filter name (`all|pending|completed`) and lists.
    pub fn list_named(&self, filter: &str) -> ServiceResult<Vec<Task>> {
        let filter = self.check("task_list", None, || validate_filter(filter))?;
        Ok(self.list(filter))
    }

    /// Returns one task by id, if present.
    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    /// Drops every task and clears the durable copy (best-effort).
    pub fn clear_all(&mut self) {
        let removed = self.tasks.len();
        self.tasks.clear();
        self.repo.clear();
        info!("event=task_clear module=service status=ok removed={removed}");
    }

    fn check<T>(
        &self,
        event: &str,
        id: Option<TaskId>,
        rule: impl FnOnce() -> Result<T, ValidationError>,
    ) -> ServiceResult<T> {
        rule().map_err(|err| {
            let kind = TaskErrorKind::from(&err);
            match id {
                Some(id) => info!(
                    "event={event} module=service status=rejected task_id={id} error_kind={kind}"
                ),
                None => info!("event={event} module=service status=rejected error_kind={kind}"),
            }
            TaskServiceError::Validation(err)
        })
    }

    fn position(&self, id: TaskId, event: &str) -> ServiceResult<usize> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| {
                info!(
                    "event={event} module=service status=rejected task_id={id} error_kind=not_found"
                );
                TaskServiceError::NotFound(id)
            })
    }

    fn persist(&self, event: &str) -> ServiceResult<()> {
        self.repo.save(&self.tasks).map_err(|err| {
            error!(
                "event={event} module=service status=error error_code=persist_failed count={} error={err}",
                self.tasks.len()
            );
            TaskServiceError::Persistence(err)
        })
    }
}
