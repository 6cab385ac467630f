//! Use-case layer.
//!
//! # Responsibility
//! - Validate form input and derive new task arrays.
//! - Orchestrate commit-then-persist through `SyncEngine`.
//!
//! # See also
//! - `crate::state` for the transition function.

pub mod error;
pub mod error_slots;
pub mod sync_engine;
pub mod task_ops;
pub mod validation;
