//! Sync engine error taxonomy.

use crate::auth::AuthError;
use crate::model::task::{SubTaskId, TaskId};
use crate::model::user::Uid;
use crate::repo::remote_store::RemoteError;
use crate::repo::session_cache::CacheError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// Rejected user input. No state was mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty.
    EmptyFields,
    /// A text field starts with whitespace.
    LeadingWhitespace,
    /// A text field exceeds its input limit.
    TooLong {
        field: &'static str,
        max_chars: usize,
    },
    /// Due date is not a `YYYY-MM-DD` calendar date.
    InvalidDueDate(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyFields => "empty_input_fields",
            Self::LeadingWhitespace => "leading_whitespace",
            Self::TooLong { .. } => "input_too_long",
            Self::InvalidDueDate(_) => "invalid_due_date",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFields => write!(f, "Found input fields empty."),
            Self::LeadingWhitespace => write!(f, "Found white-spaces before any word."),
            Self::TooLong { field, max_chars } => {
                write!(f, "`{field}` must have at most {max_chars} characters.")
            }
            Self::InvalidDueDate(value) => write!(f, "invalid due date `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Entity referenced by an operation that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingEntity {
    User(Uid),
    Task(TaskId),
    SubTask {
        task_id: TaskId,
        sub_task_id: SubTaskId,
    },
}

impl Display for MissingEntity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(uid) => write!(f, "user {uid}"),
            Self::Task(task_id) => write!(f, "task {task_id}"),
            Self::SubTask {
                task_id,
                sub_task_id,
            } => write!(f, "sub-task {sub_task_id} of task {task_id}"),
        }
    }
}

/// Error surfaced by every sync engine operation.
#[derive(Debug)]
pub enum SyncError {
    Validation(ValidationError),
    /// Add-task candidate reuses an existing task name.
    DuplicateName(String),
    /// Remote document for this uid already exists.
    DuplicateKey(Uid),
    NotFound(MissingEntity),
    /// Remote call failed. Optimistic state is kept as is.
    TransientIo(String),
    /// Remote document cannot be decoded.
    InvalidRemoteData(String),
    Auth(AuthError),
    Cache(CacheError),
    /// Operation requires a logged-in user.
    NotLoggedIn,
}

impl SyncError {
    /// Stable machine-readable code, used for logs and form error slots.
    pub fn code(&self) -> &str {
        match self {
            Self::Validation(err) => err.code(),
            Self::DuplicateName(_) => "duplicate_task_name",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::NotFound(_) => "not_found",
            Self::TransientIo(_) => "transient_io",
            Self::InvalidRemoteData(_) => "invalid_remote_data",
            Self::Auth(err) => err.code.as_str(),
            Self::Cache(_) => "cache_failure",
            Self::NotLoggedIn => "not_logged_in",
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateName(_) => write!(f, "Duplicate task name."),
            Self::DuplicateKey(uid) => write!(f, "user already exists: {uid}"),
            Self::NotFound(entity) => write!(f, "not found: {entity}"),
            Self::TransientIo(message) => write!(f, "remote write failed: {message}"),
            Self::InvalidRemoteData(message) => write!(f, "invalid remote data: {message}"),
            Self::Auth(err) => write!(f, "{err}"),
            Self::Cache(err) => write!(f, "{err}"),
            Self::NotLoggedIn => write!(f, "no user is logged in"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Auth(err) => Some(err),
            Self::Cache(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for SyncError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<AuthError> for SyncError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<CacheError> for SyncError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<RemoteError> for SyncError {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::TransientIo(message) => Self::TransientIo(message),
            RemoteError::DuplicateKey(uid) => Self::DuplicateKey(uid),
            RemoteError::NotFound(uid) => Self::NotFound(MissingEntity::User(uid)),
            other @ RemoteError::InvalidDocument { .. } => {
                Self::InvalidRemoteData(other.to_string())
            }
        }
    }
}
