//! Input validation for task, sub-task and profile forms.
//!
//! # Invariants
//! - Add-task checks run in a fixed order and stop at the first failure:
//!   duplicate name, empty fields, leading whitespace, length, due date.
//! - The duplicate-name check only runs at creation time.

use crate::model::task::Task;
use crate::model::user::ProfileDetails;
use crate::service::error::{SyncError, ValidationError};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_TASK_NAME_CHARS: usize = 20;
pub const MAX_SUB_TASK_DESC_CHARS: usize = 55;
pub const MAX_USERNAME_CHARS: usize = 11;
pub const MAX_PHONE_NUMBER_CHARS: usize = 10;

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

static LEADING_WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+").expect("valid leading whitespace regex"));

/// Raw task form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub task_name: String,
    /// `YYYY-MM-DD`.
    pub due_date: String,
    pub desc: String,
}

impl TaskDraft {
    pub fn new(
        task_name: impl Into<String>,
        due_date: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            due_date: due_date.into(),
            desc: desc.into(),
        }
    }
}

/// Validates an add-task draft against the pre-mutation task list.
///
/// Returns the parsed due date on success.
pub fn validate_new_task(existing: &[Task], draft: &TaskDraft) -> Result<NaiveDate, SyncError> {
    if existing.iter().any(|task| task.task_name == draft.task_name) {
        return Err(SyncError::DuplicateName(draft.task_name.clone()));
    }
    Ok(validate_task_fields(draft)?)
}

/// Field checks shared by add-task and edit-task.
pub fn validate_task_fields(draft: &TaskDraft) -> Result<NaiveDate, ValidationError> {
    if draft.task_name.is_empty() || draft.due_date.is_empty() || draft.desc.is_empty() {
        return Err(ValidationError::EmptyFields);
    }
    if starts_with_whitespace(&draft.task_name) || starts_with_whitespace(&draft.desc) {
        return Err(ValidationError::LeadingWhitespace);
    }
    check_length("taskName", &draft.task_name, MAX_TASK_NAME_CHARS)?;
    NaiveDate::parse_from_str(&draft.due_date, DUE_DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDueDate(draft.due_date.clone()))
}

pub fn validate_sub_task_desc(desc: &str) -> Result<(), ValidationError> {
    if desc.is_empty() {
        return Err(ValidationError::EmptyFields);
    }
    if starts_with_whitespace(desc) {
        return Err(ValidationError::LeadingWhitespace);
    }
    check_length("desc", desc, MAX_SUB_TASK_DESC_CHARS)
}

pub fn validate_profile(details: &ProfileDetails) -> Result<(), ValidationError> {
    check_length("username", &details.username, MAX_USERNAME_CHARS)?;
    check_length("phoneNumber", &details.phone_number, MAX_PHONE_NUMBER_CHARS)
}

fn starts_with_whitespace(value: &str) -> bool {
    LEADING_WHITESPACE_RE.is_match(value)
}

fn check_length(field: &'static str, value: &str, max_chars: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(())
}
