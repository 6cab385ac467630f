//! Remote user-collection contract and in-memory implementation.
//!
//! # Responsibility
//! - Define the four operations the core needs from the hosted document
//!   collection: fetch-all, create, replace-tasks and update-profile.
//! - Provide an in-memory collection that stores documents as JSON objects,
//!   with fault injection for connectivity loss.
//!
//! # Invariants
//! - Every operation is a single attempt; nothing here retries or queues.
//! - Documents are keyed by `uid`; the task array is always rewritten whole.
//! - `update_profile` touches only `username` and `phoneNumber`.

use crate::model::task::Task;
use crate::model::user::{ProfileDetails, Uid, User};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure reported by a remote store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connectivity loss or transport failure.
    TransientIo(String),
    /// `create_user` on an existing `uid`.
    DuplicateKey(Uid),
    /// Write targeted a `uid` that has no document.
    NotFound(Uid),
    /// Stored document cannot be converted to or from the user model.
    InvalidDocument { uid: Uid, message: String },
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransientIo(message) => write!(f, "remote store unavailable: {message}"),
            Self::DuplicateKey(uid) => write!(f, "user document already exists: {uid}"),
            Self::NotFound(uid) => write!(f, "user document not found: {uid}"),
            Self::InvalidDocument { uid, message } => {
                write!(f, "invalid user document `{uid}`: {message}")
            }
        }
    }
}

impl Error for RemoteError {}

/// Operation contract of the hosted user collection.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Reads every user document in the collection.
    async fn fetch_all(&self) -> RemoteResult<Vec<User>>;
    /// Creates the document for a new user.
    async fn create_user(&self, user: &User) -> RemoteResult<()>;
    /// Overwrites the `tasks` field of one document. Idempotent.
    async fn replace_tasks(&self, uid: &str, tasks: &[Task]) -> RemoteResult<()>;
    /// Partially updates the profile fields of one document.
    async fn update_profile(&self, uid: &str, details: &ProfileDetails) -> RemoteResult<()>;
}

type Document = Map<String, Value>;

/// In-process document collection.
///
/// Holds each user as a JSON object so that the stored shape matches the
/// key-value layout of the hosted collection.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    documents: Mutex<BTreeMap<Uid, Document>>,
    faults: Mutex<Faults>,
}

#[derive(Default)]
struct Faults {
    offline: bool,
    queued: VecDeque<RemoteError>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection pre-populated with `users`.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> RemoteResult<Self> {
        let store = Self::new();
        {
            let mut documents = store.documents();
            for user in users {
                let document = to_document(&user)?;
                documents.insert(user.uid.clone(), document);
            }
        }
        Ok(store)
    }

    /// While offline, every operation fails with `TransientIo`.
    pub fn set_offline(&self, offline: bool) {
        self.faults().offline = offline;
    }

    /// Makes the next operation fail with `error`, whatever it is.
    pub fn fail_next(&self, error: RemoteError) {
        self.faults().queued.push_back(error);
    }

    /// Raw stored document, for inspection.
    pub fn document(&self, uid: &str) -> Option<Value> {
        self.documents().get(uid).cloned().map(Value::Object)
    }

    /// Decoded user document.
    pub fn user(&self, uid: &str) -> RemoteResult<Option<User>> {
        self.documents()
            .get(uid)
            .map(|document| from_document(uid, document))
            .transpose()
    }

    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents().is_empty()
    }

    fn check_faults(&self) -> RemoteResult<()> {
        let mut faults = self.faults();
        if let Some(error) = faults.queued.pop_front() {
            return Err(error);
        }
        if faults.offline {
            return Err(RemoteError::TransientIo("connection lost".to_string()));
        }
        Ok(())
    }

    fn documents(&self) -> MutexGuard<'_, BTreeMap<Uid, Document>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn fetch_all(&self) -> RemoteResult<Vec<User>> {
        self.check_faults()?;
        self.documents()
            .iter()
            .map(|(uid, document)| from_document(uid, document))
            .collect()
    }

    async fn create_user(&self, user: &User) -> RemoteResult<()> {
        self.check_faults()?;
        let document = to_document(user)?;
        let mut documents = self.documents();
        if documents.contains_key(&user.uid) {
            return Err(RemoteError::DuplicateKey(user.uid.clone()));
        }
        documents.insert(user.uid.clone(), document);
        Ok(())
    }

    async fn replace_tasks(&self, uid: &str, tasks: &[Task]) -> RemoteResult<()> {
        self.check_faults()?;
        let tasks = serde_json::to_value(tasks).map_err(|err| invalid(uid, err))?;
        let mut documents = self.documents();
        let document = documents
            .get_mut(uid)
            .ok_or_else(|| RemoteError::NotFound(uid.to_string()))?;
        document.insert("tasks".to_string(), tasks);
        Ok(())
    }

    async fn update_profile(&self, uid: &str, details: &ProfileDetails) -> RemoteResult<()> {
        self.check_faults()?;
        let mut documents = self.documents();
        let document = documents
            .get_mut(uid)
            .ok_or_else(|| RemoteError::NotFound(uid.to_string()))?;
        document.insert(
            "username".to_string(),
            Value::String(details.username.clone()),
        );
        document.insert(
            "phoneNumber".to_string(),
            Value::String(details.phone_number.clone()),
        );
        Ok(())
    }
}

fn to_document(user: &User) -> RemoteResult<Document> {
    match serde_json::to_value(user).map_err(|err| invalid(&user.uid, err))? {
        Value::Object(document) => Ok(document),
        other => Err(RemoteError::InvalidDocument {
            uid: user.uid.clone(),
            message: format!("expected object, got {other}"),
        }),
    }
}

fn from_document(uid: &str, document: &Document) -> RemoteResult<User> {
    serde_json::from_value(Value::Object(document.clone())).map_err(|err| invalid(uid, err))
}

fn invalid(uid: &str, err: serde_json::Error) -> RemoteError {
    RemoteError::InvalidDocument {
        uid: uid.to_string(),
        message: err.to_string(),
    }
}
