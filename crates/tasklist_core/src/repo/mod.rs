//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable key-value slot contract and its backends.
//! - Encode/decode the versioned task envelope stored in that slot.
//!
//! # Invariants
//! - The whole task collection is written as one value under one key.
//! - Read paths reject malformed persisted state instead of masking it.

pub mod kv_slot;
pub mod task_repo;

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for slot access and envelope encoding.
#[derive(Debug)]
pub enum RepoError {
    /// SQLite transport failure.
    Db(DbError),
    /// Slot rejected the write (quota exceeded, storage unavailable).
    Storage(String),
    /// Envelope could not be serialized.
    Encode(serde_json::Error),
    /// Stored value is not valid JSON.
    Decode(serde_json::Error),
    /// Stored JSON does not describe a task collection.
    InvalidData(String),
    /// Envelope was written by a newer, incompatible schema.
    UnsupportedVersion(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Storage(message) => write!(f, "storage unavailable: {message}"),
            Self::Encode(err) => write!(f, "failed to encode tasks: {err}"),
            Self::Decode(err) => write!(f, "persisted tasks are not valid JSON: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::UnsupportedVersion(version) => {
                write!(f, "persisted schema version `{version}` is not supported")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) | Self::Decode(err) => Some(err),
            Self::Storage(_) | Self::InvalidData(_) | Self::UnsupportedVersion(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
