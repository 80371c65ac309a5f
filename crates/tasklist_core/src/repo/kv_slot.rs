//! Durable key-value slot contract and backends.
//!
//! # Responsibility
//! - Store opaque string values under string keys.
//! - Provide a SQLite backend for real use and an in-memory backend for tests.
//!
//! # Invariants
//! - `set` replaces any previous value under the same key.
//! - `remove` of an absent key succeeds.

use super::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Minimal durable storage interface used by the task repository.
pub trait KeyValueSlot {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> RepoResult<()>;
    fn remove(&self, key: &str) -> RepoResult<()>;
}

impl<S: KeyValueSlot + ?Sized> KeyValueSlot for &S {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> RepoResult<()> {
        (**self).remove(key)
    }
}

/// SQLite-backed slot over the `kv_slots` table.
pub struct SqliteKeyValueSlot<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeyValueSlot<'conn> {
    /// Wraps a connection returned by `db::open_db*` (migrations applied).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl KeyValueSlot for SqliteKeyValueSlot<'_> {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_slots (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM kv_slots WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// In-memory slot for tests.
///
/// Uses `RefCell` since the task service is single-threaded; all trait
/// methods still take `&self`.
#[derive(Default)]
pub struct MemoryKeyValueSlot {
    values: RefCell<HashMap<String, String>>,
    simulate_write_error: Cell<bool>,
}

impl MemoryKeyValueSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `set` and `remove` fail, mimicking an exhausted or unavailable
    /// browser-style storage quota.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.simulate_write_error.get() {
            return Err(RepoError::Storage("simulated write error".to_string()));
        }
        Ok(())
    }
}

impl KeyValueSlot for MemoryKeyValueSlot {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.check_writable()?;
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> RepoResult<()> {
        self.check_writable()?;
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}
