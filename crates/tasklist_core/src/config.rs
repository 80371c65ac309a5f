//! Compile-time configuration shared by core and collaborators.
//!
//! # Invariants
//! - `STORAGE_KEY` never changes between releases; older payloads live there.
//! - `STORAGE_VERSION` is a `major.minor.patch` triplet.

/// Fixed key of the durable slot holding the whole task collection.
pub const STORAGE_KEY: &str = "todoList";
/// Schema version written into every persisted envelope.
pub const STORAGE_VERSION: &str = "1.0.0";

/// Minimum task text length, in chars, after trimming.
pub const MIN_TASK_LENGTH: usize = 1;
/// Maximum task text length, in chars, after trimming.
pub const MAX_TASK_LENGTH: usize = 500;

pub const FILTER_ALL: &str = "all";
pub const FILTER_PENDING: &str = "pending";
pub const FILTER_COMPLETED: &str = "completed";

/// Filter names accepted by list queries, in display order.
pub const SUPPORTED_FILTERS: &[&str] = &[FILTER_ALL, FILTER_PENDING, FILTER_COMPLETED];
