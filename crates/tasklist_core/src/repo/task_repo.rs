//! Task repository contract and slot-backed implementation.
//!
//! # Responsibility
//! - Persist the whole task collection as one versioned JSON envelope.
//! - Load either the envelope or the legacy bare-array payload.
//!
//! # Invariants
//! - `createdAt` and `timestamp` are ISO-8601 UTC strings with millisecond
//!   precision.
//! - Loaded collections never contain a zero id or a repeated id.
//! - Fractional ids written by the browser app (`Date.now() + Math.random()`)
//!   load under fresh integer ids; order and every other field are kept.
//! - Envelopes from a newer major schema version are rejected, older ones load.

use super::kv_slot::KeyValueSlot;
use super::{RepoError, RepoResult};
use crate::config::{STORAGE_KEY, STORAGE_VERSION};
use crate::model::task::{format_timestamp, now_millis, Task, TaskId};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashSet;

/// Serialized shape of one task inside the persisted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: String,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            text: task.text.clone(),
            completed: task.completed,
            created_at: format_timestamp(task.created_at),
        }
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = RepoError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        if record.id == 0 {
            return Err(RepoError::InvalidData("task id must be positive".to_string()));
        }
        let created_at = parse_timestamp(&record.created_at).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid createdAt `{}` for task {}",
                record.created_at, record.id
            ))
        })?;

        let mut task = Task::with_created_at(record.id, record.text, created_at);
        task.completed = record.completed;
        Ok(task)
    }
}

/// Versioned wrapper persisted under `STORAGE_KEY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedEnvelope {
    pub version: Option<String>,
    pub timestamp: Option<String>,
    pub tasks: Vec<TaskRecord>,
}

impl PersistedEnvelope {
    /// Builds a current-version envelope stamped with `saved_at`.
    pub fn from_tasks(tasks: &[Task], saved_at: DateTime<Utc>) -> Self {
        Self {
            version: Some(STORAGE_VERSION.to_string()),
            timestamp: Some(format_timestamp(saved_at)),
            tasks: tasks.iter().map(TaskRecord::from).collect(),
        }
    }
}

/// Read-side shape of one task. `id` stays a raw JSON number until
/// `classify_id` decides whether it can be kept.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTaskRecord {
    id: Number,
    text: String,
    #[serde(default)]
    completed: bool,
    created_at: String,
}

/// Read-side envelope. `version` is optional so early envelopes that only
/// carried `tasks` still load; `timestamp` is not needed on read.
#[derive(Debug, Deserialize)]
struct StoredEnvelope {
    #[serde(default)]
    version: Option<String>,
    tasks: Vec<StoredTaskRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StoredId {
    Exact(TaskId),
    Fractional(f64),
}

/// Largest integer an `f64` represents exactly (2^53).
const MAX_EXACT_FLOAT_ID: f64 = 9_007_199_254_740_992.0;

/// Persistence contract used by the task service.
pub trait TaskRepository {
    /// Replaces the persisted collection with `tasks`.
    fn save(&self, tasks: &[Task]) -> RepoResult<()>;
    /// Reads the persisted collection; empty when nothing was saved yet.
    fn load(&self) -> RepoResult<Vec<Task>>;
    /// Removes the persisted collection. Best-effort: failures are logged only.
    fn clear(&self);
}

impl<R: TaskRepository + ?Sized> TaskRepository for &R {
    fn save(&self, tasks: &[Task]) -> RepoResult<()> {
        (**self).save(tasks)
    }

    fn load(&self) -> RepoResult<Vec<Task>> {
        (**self).load()
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// Task repository writing one envelope into a key-value slot.
pub struct SlotTaskRepository<S: KeyValueSlot> {
    slot: S,
    key: String,
}

impl<S: KeyValueSlot> SlotTaskRepository<S> {
    /// Creates a repository bound to the default `STORAGE_KEY`.
    pub fn new(slot: S) -> Self {
        Self::with_key(slot, STORAGE_KEY)
    }

    /// Creates a repository bound to a caller-chosen key.
    pub fn with_key(slot: S, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
        }
    }
}

impl<S: KeyValueSlot> TaskRepository for SlotTaskRepository<S> {
    fn save(&self, tasks: &[Task]) -> RepoResult<()> {
        let envelope = PersistedEnvelope::from_tasks(tasks, now_millis());
        let encoded = serde_json::to_string(&envelope).map_err(RepoError::Encode)?;

        if let Err(err) = self.slot.set(&self.key, &encoded) {
            warn!(
                "event=tasks_save module=repo status=error count={} bytes={} error={}",
                tasks.len(),
                encoded.len(),
                err
            );
            return Err(err);
        }

        info!(
            "event=tasks_save module=repo status=ok count={} bytes={}",
            tasks.len(),
            encoded.len()
        );
        Ok(())
    }

    fn load(&self) -> RepoResult<Vec<Task>> {
        let Some(raw) = self.slot.get(&self.key)? else {
            info!("event=tasks_load module=repo status=ok shape=absent count=0");
            return Ok(Vec::new());
        };

        let (shape, records) = decode_payload(&raw)?;
        let tasks = records_to_tasks(records)?;
        info!(
            "event=tasks_load module=repo status=ok shape={shape} count={}",
            tasks.len()
        );
        Ok(tasks)
    }

    fn clear(&self) {
        match self.slot.remove(&self.key) {
            Ok(()) => info!("event=tasks_clear module=repo status=ok"),
            Err(err) => warn!("event=tasks_clear module=repo status=error error={err}"),
        }
    }
}

fn decode_payload(raw: &str) -> RepoResult<(&'static str, Vec<StoredTaskRecord>)> {
    let value: Value = serde_json::from_str(raw).map_err(RepoError::Decode)?;
    match value {
        Value::Array(_) => {
            let records = serde_json::from_value::<Vec<StoredTaskRecord>>(value)
                .map_err(|err| RepoError::InvalidData(err.to_string()))?;
            Ok(("legacy_array", records))
        }
        Value::Object(_) => {
            let envelope = serde_json::from_value::<StoredEnvelope>(value)
                .map_err(|err| RepoError::InvalidData(err.to_string()))?;
            if let Some(version) = envelope.version.as_deref() {
                check_version(version)?;
            }
            Ok(("envelope", envelope.tasks))
        }
        other => Err(RepoError::InvalidData(format!(
            "expected envelope object or task array, got {}",
            json_kind(&other)
        ))),
    }
}

fn records_to_tasks(records: Vec<StoredTaskRecord>) -> RepoResult<Vec<Task>> {
    let ids = records
        .iter()
        .map(|record| classify_id(&record.id))
        .collect::<RepoResult<Vec<_>>>()?;

    // Exact ids are reserved first so a re-keyed id never takes one of them.
    let mut taken = HashSet::with_capacity(records.len());
    for id in &ids {
        if let StoredId::Exact(id) = id {
            if !taken.insert(*id) {
                return Err(RepoError::InvalidData(format!("duplicate task id {id}")));
            }
        }
    }

    let mut rekeyed = 0usize;
    let tasks = records
        .into_iter()
        .zip(ids)
        .map(|(record, id)| {
            let id = match id {
                StoredId::Exact(id) => id,
                StoredId::Fractional(value) => {
                    rekeyed += 1;
                    rekey_fractional_id(value, &mut taken)
                }
            };
            Task::try_from(TaskRecord {
                id,
                text: record.text,
                completed: record.completed,
                created_at: record.created_at,
            })
        })
        .collect::<RepoResult<Vec<_>>>()?;

    if rekeyed > 0 {
        info!("event=tasks_load module=repo status=rekeyed count={rekeyed}");
    }
    Ok(tasks)
}

fn classify_id(id: &Number) -> RepoResult<StoredId> {
    if let Some(exact) = id.as_u64() {
        return Ok(StoredId::Exact(exact));
    }
    let value = id
        .as_f64()
        .filter(|value| value.is_finite() && *value > 0.0)
        .ok_or_else(|| RepoError::InvalidData(format!("task id must be positive, got {id}")))?;
    if value.fract() == 0.0 && value <= MAX_EXACT_FLOAT_ID {
        return Ok(StoredId::Exact(value as TaskId));
    }
    Ok(StoredId::Fractional(value))
}

/// Picks the first free id at or above `floor(value)`.
fn rekey_fractional_id(value: f64, taken: &mut HashSet<TaskId>) -> TaskId {
    let mut candidate = (value.floor() as TaskId).max(1);
    while !taken.insert(candidate) {
        candidate = candidate.checked_add(1).unwrap_or(1);
    }
    candidate
}

fn check_version(version: &str) -> RepoResult<()> {
    let persisted = parse_version_triplet(version)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid schema version `{version}`")))?;
    let current = parse_version_triplet(STORAGE_VERSION)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid schema version `{STORAGE_VERSION}`")))?;

    if persisted.0 > current.0 {
        return Err(RepoError::UnsupportedVersion(version.to_string()));
    }
    if persisted != current {
        info!("event=tasks_load module=repo status=upgrade from_version={version} to_version={STORAGE_VERSION}");
    }
    Ok(())
}

fn parse_version_triplet(value: &str) -> Option<(u64, u64, u64)> {
    let mut parts = value.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
