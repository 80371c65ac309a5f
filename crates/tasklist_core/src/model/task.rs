//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical record for one to-do item.
//! - Provide in-place mutation helpers used by the service layer.
//!
//! # Invariants
//! - `id` and `created_at` never change after construction.
//! - `created_at` carries millisecond precision so it survives persistence
//!   unchanged.
//! - `text` is stored exactly as given; validation and sanitization happen
//!   before it reaches this type.

use crate::config::{FILTER_ALL, FILTER_COMPLETED, FILTER_PENDING};
use crate::validation::ValidationError;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Stable task identifier. Zero is reserved as "no id".
pub type TaskId = u64;

/// One user-entered to-do item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    /// Sanitized display text.
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending task stamped with the current time.
    pub fn new(id: TaskId, text: impl Into<String>) -> Self {
        Self::with_created_at(id, text, now_millis())
    }

    /// Creates a pending task with a caller-provided creation time.
    ///
    /// Used by the load path where identity and timestamps already exist.
    pub fn with_created_at(id: TaskId, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            created_at: created_at.trunc_subsecs(3),
        }
    }

    /// Flips completion state and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.completed = !self.completed;
        self.completed
    }

    /// Replaces text verbatim.
    pub fn update_text(&mut self, new_text: impl Into<String>) {
        self.text = new_text.into();
    }
}

/// Current UTC time truncated to milliseconds.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Formats a timestamp as ISO-8601 UTC with milliseconds (`...T08:30:00.000Z`).
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Subset selector for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl TaskFilter {
    /// Wire name used by collaborators.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => FILTER_ALL,
            Self::Pending => FILTER_PENDING,
            Self::Completed => FILTER_COMPLETED,
        }
    }

    /// Returns whether `task` belongs to this subset.
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

impl Display for TaskFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            FILTER_ALL => Ok(Self::All),
            FILTER_PENDING => Ok(Self::Pending),
            FILTER_COMPLETED => Ok(Self::Completed),
            other => Err(ValidationError::InvalidFilter(other.to_string())),
        }
    }
}

/// Aggregate counters over the live collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    /// Always `total - completed`.
    pub pending: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
        }
    }
}
