//! Client-side sync core for Taskerer.
//! Owns the session model, its durable cache and the optimistic write path.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod state;

pub use auth::{AuthError, CredentialProvider, Identity, InMemoryCredentialProvider};
pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::id::{IdGenerator, RandomIdGenerator};
pub use model::task::{SubTask, SubTaskId, Task, TaskId};
pub use model::user::{ProfileDetails, Uid, User};
pub use repo::remote_store::{InMemoryRemoteStore, RemoteError, RemoteResult, RemoteStore};
pub use repo::session_cache::{CacheError, CacheResult, LocalCache, SqliteLocalCache};
pub use service::error::{MissingEntity, SyncError, SyncResult, ValidationError};
pub use service::error_slots::FormContext;
pub use service::sync_engine::SyncEngine;
pub use service::validation::TaskDraft;
pub use state::{Action, SessionState, StateStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
