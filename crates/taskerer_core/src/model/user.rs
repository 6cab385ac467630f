//! User document model.
//!
//! # Responsibility
//! - Define the per-identity document stored in the remote collection.
//! - Provide copy-on-write helpers used by the sync engine to derive new
//!   snapshots without touching the current one.
//!
//! # Invariants
//! - `uid` is unique across the collection and never changes.
//! - `tasks` keeps insertion order; identity is by `Task::id`.

use crate::model::task::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity key of a user document.
pub type Uid = String;

/// Placeholder username written at sign-up until the user fills the profile.
pub const PROFILE_PLACEHOLDER: &str = "Empty";

/// Editable profile fields (partial update payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    pub username: String,
    pub phone_number: String,
}

/// One user document: flat profile fields plus the nested task tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: Uid,
    pub email: String,
    pub username: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl User {
    /// Builds the document written for a freshly signed-up identity.
    pub fn signed_up(
        uid: impl Into<Uid>,
        email: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            username: PROFILE_PLACEHOLDER.to_string(),
            phone_number: String::new(),
            created_at,
            tasks: Vec::new(),
        }
    }

    /// Whether the profile still carries the sign-up placeholder.
    pub fn needs_profile_details(&self) -> bool {
        self.username == PROFILE_PLACEHOLDER || self.username.trim().is_empty()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// The task flagged `selected`, if any.
    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|task| task.selected)
    }

    /// Returns a copy of this user with `tasks` replaced.
    pub fn with_tasks(&self, tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..self.clone()
        }
    }

    /// Returns a copy of this user with profile fields merged in.
    pub fn with_profile(&self, details: &ProfileDetails) -> Self {
        Self {
            username: details.username.clone(),
            phone_number: details.phone_number.clone(),
            ..self.clone()
        }
    }

    pub fn profile(&self) -> ProfileDetails {
        ProfileDetails {
            username: self.username.clone(),
            phone_number: self.phone_number.clone(),
        }
    }
}
