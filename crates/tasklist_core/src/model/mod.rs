//! Task-list domain model.
//!
//! # Responsibility
//! - Define the task record owned by the service layer.
//! - Define query-side value types (filter, stats).
//!
//! # Invariants
//! - Every task is identified by a non-zero `TaskId` that is never reassigned.

pub mod task;
