//! Hierarchical task model mirrored from the remote user collection.
//!
//! # Responsibility
//! - Define the canonical `User -> Task -> SubTask` ownership tree.
//! - Provide identifier generation for tasks and sub-tasks.
//! - Provide read-only derivations (progress, concluded, past-due).
//!
//! # Invariants
//! - Tasks and sub-tasks are identified by `id`, never by name or position.
//! - A `User` owns its tasks exclusively; a `Task` owns its sub-tasks.
//! - At most one task per user carries `selected = true`.

pub mod id;
pub mod task;
pub mod user;
