//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the task-list collaborator interface (add/remove/toggle/edit/
//!   list/stats) as sync functions returning plain response envelopes.
//! - Surface failures as `error_kind` + `message` pairs for transient
//!   notifications; delete confirmation stays on the Dart side.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Each call holds `SERVICE_LOCK` for its whole load-mutate-save sequence.

use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};
use tasklist_core::db::open_db;
use tasklist_core::model::task::format_timestamp;
use tasklist_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, parse_task_id,
    ping as ping_inner, validate_filter, ServiceResult, SlotTaskRepository, SqliteKeyValueSlot,
    Task, TaskErrorKind, TaskId, TaskService, TaskServiceError, ValidationError,
};

const DB_FILE_NAME: &str = "tasklist.sqlite3";
const DB_PATH_ENV: &str = "TASKLIST_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static SERVICE_LOCK: Mutex<()> = Mutex::new(());

type SqliteTaskService<'conn> = TaskService<SlotTaskRepository<SqliteKeyValueSlot<'conn>>>;

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Display projection of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    /// Stable task id in decimal string form.
    pub id: String,
    /// Sanitized text, safe to render as-is.
    pub text: String,
    pub completed: bool,
    /// ISO-8601 UTC creation time.
    pub created_at: String,
}

/// Result envelope for mutating calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    pub ok: bool,
    /// Affected task; `None` on failure and after removal.
    pub task: Option<TaskItem>,
    /// Stable error code (`too_short`, `duplicate`, ...) when `ok == false`.
    pub error_kind: Option<String>,
    /// Human-readable message for notifications.
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, task: Option<&Task>) -> Self {
        Self {
            ok: true,
            task: task.map(to_task_item),
            error_kind: None,
            message: message.into(),
        }
    }

    fn failure(failure: CallFailure) -> Self {
        Self {
            ok: false,
            task: None,
            error_kind: Some(failure.kind.as_str().to_string()),
            message: failure.message,
        }
    }
}

/// Result envelope for list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub ok: bool,
    /// Tasks in insertion order.
    pub items: Vec<TaskItem>,
    pub error_kind: Option<String>,
    pub message: String,
}

/// Result envelope for collection counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatsResponse {
    pub ok: bool,
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub error_kind: Option<String>,
    pub message: String,
}

/// Adds a task from the entry field.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_add(text: String) -> TaskActionResponse {
    match with_task_service(|service| service.add(&text)) {
        Ok(task) => TaskActionResponse::success("Task added.", Some(&task)),
        Err(failure) => TaskActionResponse::failure(failure),
    }
}

/// Removes a task. Callers confirm with the user before invoking this.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_remove(id: String) -> TaskActionResponse {
    let result = parse_id(&id).and_then(|task_id| {
        with_task_service(|service| service.remove(task_id))
    });
    match result {
        Ok(_) => TaskActionResponse::success("Task removed.", None),
        Err(failure) => TaskActionResponse::failure(failure),
    }
}

/// Flips completion state of a task.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_toggle(id: String) -> TaskActionResponse {
    let result = parse_id(&id).and_then(|task_id| {
        with_task_service(|service| service.toggle(task_id))
    });
    match result {
        Ok(task) => {
            let message = if task.completed {
                "Task marked as completed."
            } else {
                "Task marked as pending."
            };
            TaskActionResponse::success(message, Some(&task))
        }
        Err(failure) => TaskActionResponse::failure(failure),
    }
}

/// Replaces the text of a task.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_edit(id: String, text: String) -> TaskActionResponse {
    let result = parse_id(&id).and_then(|task_id| {
        with_task_service(|service| service.edit(task_id, &text))
    });
    match result {
        Ok(task) => TaskActionResponse::success("Task updated.", Some(&task)),
        Err(failure) => TaskActionResponse::failure(failure),
    }
}

/// Lists tasks for the `all|pending|completed` tab.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_list(filter: String) -> TaskListResponse {
    let result = validate_filter(filter.trim())
        .map_err(CallFailure::from)
        .and_then(|filter| with_task_service(|service| Ok(service.list(filter))));
    match result {
        Ok(tasks) => TaskListResponse {
            ok: true,
            message: format!("{} task(s).", tasks.len()),
            items: tasks.iter().map(to_task_item).collect(),
            error_kind: None,
        },
        Err(failure) => TaskListResponse {
            ok: false,
            items: Vec::new(),
            error_kind: Some(failure.kind.as_str().to_string()),
            message: failure.message,
        },
    }
}

/// Returns total/completed/pending counters.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_stats() -> TaskStatsResponse {
    match with_task_service(|service| Ok(service.stats())) {
        Ok(stats) => TaskStatsResponse {
            ok: true,
            total: stats.total,
            completed: stats.completed,
            pending: stats.pending,
            error_kind: None,
            message: String::new(),
        },
        Err(failure) => TaskStatsResponse {
            ok: false,
            total: 0,
            completed: 0,
            pending: 0,
            error_kind: Some(failure.kind.as_str().to_string()),
            message: failure.message,
        },
    }
}

#[derive(Debug)]
struct CallFailure {
    kind: TaskErrorKind,
    message: String,
}

impl From<TaskServiceError> for CallFailure {
    fn from(value: TaskServiceError) -> Self {
        Self {
            kind: value.kind(),
            message: value.to_string(),
        }
    }
}

impl From<ValidationError> for CallFailure {
    fn from(value: ValidationError) -> Self {
        TaskServiceError::from(value).into()
    }
}

fn parse_id(raw: &str) -> Result<TaskId, CallFailure> {
    parse_task_id(raw).map_err(CallFailure::from)
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_task_service<T>(
    f: impl FnOnce(&mut SqliteTaskService<'_>) -> ServiceResult<T>,
) -> Result<T, CallFailure> {
    let _guard = SERVICE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| {
        warn!("event=ffi_call module=ffi status=error error_code=db_open_failed error={err}");
        CallFailure {
            kind: TaskErrorKind::PersistenceError,
            message: format!("task storage unavailable: {err}"),
        }
    })?;
    let mut service = TaskService::new(SlotTaskRepository::new(SqliteKeyValueSlot::new(&conn)));
    f(&mut service).map_err(CallFailure::from)
}

fn to_task_item(task: &Task) -> TaskItem {
    TaskItem {
        id: task.id.to_string(),
        text: task.text.clone(),
        completed: task.completed,
        created_at: format_timestamp(task.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, ping, todo_add, todo_edit, todo_list, todo_remove,
        todo_stats, todo_toggle,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn add_toggle_edit_remove_flow() {
        let token = unique_token("ffi-flow");
        let added = todo_add(format!("task <{token}>"));
        assert!(added.ok, "{}", added.message);
        let item = added.task.expect("added task should be returned");
        assert_eq!(item.text, format!("task &lt;{token}&gt;"));
        assert!(item.created_at.ends_with('Z'));

        let toggled = todo_toggle(item.id.clone());
        assert!(toggled.ok, "{}", toggled.message);
        assert!(toggled.task.as_ref().is_some_and(|task| task.completed));

        let completed = todo_list("completed".to_string());
        assert!(completed.ok);
        assert!(completed.items.iter().any(|task| task.id == item.id));

        let edited = todo_edit(item.id.clone(), format!("renamed {token}"));
        assert!(edited.ok, "{}", edited.message);
        assert_eq!(
            edited.task.map(|task| task.text),
            Some(format!("renamed {token}"))
        );

        let removed = todo_remove(item.id.clone());
        assert!(removed.ok, "{}", removed.message);
        assert!(removed.task.is_none());

        let again = todo_remove(item.id);
        assert!(!again.ok);
        assert_eq!(again.error_kind.as_deref(), Some("not_found"));
    }

    #[test]
    fn duplicate_add_reports_duplicate_kind() {
        let token = unique_token("ffi-duplicate");
        assert!(todo_add(token.clone()).ok);

        let second = todo_add(token.to_uppercase());
        assert!(!second.ok);
        assert_eq!(second.error_kind.as_deref(), Some("duplicate"));
        assert!(!second.message.is_empty());
    }

    #[test]
    fn invalid_inputs_report_error_kinds() {
        assert_eq!(
            todo_add("   ".to_string()).error_kind.as_deref(),
            Some("too_short")
        );
        for id in ["", "abc", "-4", "0"] {
            assert_eq!(
                todo_toggle(id.to_string()).error_kind.as_deref(),
                Some("invalid_id"),
                "id `{id}`"
            );
        }
        let listed = todo_list("archived".to_string());
        assert!(!listed.ok);
        assert_eq!(listed.error_kind.as_deref(), Some("invalid_filter"));
    }

    #[test]
    fn stats_are_consistent() {
        assert!(todo_add(unique_token("ffi-stats")).ok);
        let stats = todo_stats();
        assert!(stats.ok, "{}", stats.message);
        assert!(stats.total >= 1);
        assert_eq!(stats.pending, stats.total - stats.completed);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
