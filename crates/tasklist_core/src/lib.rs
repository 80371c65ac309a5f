//! Core domain logic for the task list.
//! This crate is the single source of truth for task invariants: validation,
//! sanitization, identity and the persisted schema.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod sanitize;
pub mod service;
pub mod validation;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{Task, TaskFilter, TaskId, TaskStats};
pub use repo::kv_slot::{KeyValueSlot, MemoryKeyValueSlot, SqliteKeyValueSlot};
pub use repo::task_repo::{PersistedEnvelope, SlotTaskRepository, TaskRecord, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use sanitize::sanitize;
pub use service::task_service::{ServiceResult, TaskErrorKind, TaskService, TaskServiceError};
pub use validation::{
    parse_task_id, validate_filter, validate_task_duplicate, validate_task_id,
    validate_task_text, ValidationError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
