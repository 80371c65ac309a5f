//! Stateless validation rules for task input.
//!
//! # Responsibility
//! - Check text length bounds, duplicate text, identifiers and filter names.
//! - Report failures as typed kinds that collaborators can display verbatim.
//!
//! # Invariants
//! - Length is counted in chars after trimming surrounding whitespace.
//! - Duplicate detection is case-insensitive and whitespace-trimmed only;
//!   accents and punctuation stay significant.

use crate::config::{MAX_TASK_LENGTH, MIN_TASK_LENGTH, SUPPORTED_FILTERS};
use crate::model::task::{Task, TaskFilter, TaskId};
use crate::sanitize::sanitize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure for task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Trimmed text is shorter than `MIN_TASK_LENGTH`.
    TooShort,
    /// Trimmed text is longer than `MAX_TASK_LENGTH`.
    TooLong,
    /// Another task already carries the same text.
    Duplicate,
    /// Identifier is missing, non-numeric or non-positive.
    InvalidId,
    /// Filter name is not one of `all|pending|completed`.
    InvalidFilter(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort => write!(
                f,
                "task must have at least {MIN_TASK_LENGTH} character(s)"
            ),
            Self::TooLong => write!(
                f,
                "task cannot have more than {MAX_TASK_LENGTH} characters"
            ),
            Self::Duplicate => write!(f, "a task with this text already exists"),
            Self::InvalidId => write!(f, "invalid task id"),
            Self::InvalidFilter(value) => write!(
                f,
                "invalid filter `{value}`; expected {}",
                SUPPORTED_FILTERS.join("|")
            ),
        }
    }
}

impl Error for ValidationError {}

/// Checks trimmed text length against `[MIN_TASK_LENGTH, MAX_TASK_LENGTH]`.
pub fn validate_task_text(text: &str) -> Result<(), ValidationError> {
    let length = text.trim().chars().count();
    if length < MIN_TASK_LENGTH {
        return Err(ValidationError::TooShort);
    }
    if length > MAX_TASK_LENGTH {
        return Err(ValidationError::TooLong);
    }
    Ok(())
}

/// Rejects `text` when any existing task carries the same text.
///
/// Deliberately stricter than a plain trimmed, case-insensitive comparison:
/// stored text is already sanitized, so the candidate is compared both as
/// typed and in its sanitized form. Otherwise `Tom & Jerry` would never
/// match the stored `Tom &amp; Jerry` and could be added twice.
pub fn validate_task_duplicate(text: &str, existing: &[Task]) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::TooShort);
    }

    let raw = duplicate_key(text);
    let sanitized = duplicate_key(&sanitize(text));
    let is_duplicate = existing.iter().any(|task| {
        let key = duplicate_key(&task.text);
        key == raw || key == sanitized
    });

    if is_duplicate {
        return Err(ValidationError::Duplicate);
    }
    Ok(())
}

/// Rejects the reserved zero id.
pub fn validate_task_id(id: TaskId) -> Result<(), ValidationError> {
    if id == 0 {
        return Err(ValidationError::InvalidId);
    }
    Ok(())
}

/// Parses a collaborator-provided id string into a valid `TaskId`.
pub fn parse_task_id(raw: &str) -> Result<TaskId, ValidationError> {
    let id = raw
        .trim()
        .parse::<TaskId>()
        .map_err(|_| ValidationError::InvalidId)?;
    validate_task_id(id)?;
    Ok(id)
}

/// Resolves a filter name into a `TaskFilter`.
pub fn validate_filter(filter: &str) -> Result<TaskFilter, ValidationError> {
    filter.parse()
}

fn duplicate_key(text: &str) -> String {
    text.trim().to_lowercase()
}
