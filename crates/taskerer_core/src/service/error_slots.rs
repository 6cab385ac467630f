//! Per-form error codes.
//!
//! Each form context holds at most one active code. Starting an operation in
//! a context clears its slot; a failure fills it.

use crate::service::error::SyncError;
use std::collections::BTreeMap;

/// UI context an operation reports its error to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormContext {
    /// Session start, refresh and logout.
    Session,
    /// Sign-up / log-in form.
    Auth,
    AddTask,
    EditTask,
    /// Selection and deletion from the task list.
    TaskList,
    SubTask,
    Profile,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorSlots {
    codes: BTreeMap<FormContext, String>,
}

impl ErrorSlots {
    pub fn clear(&mut self, context: FormContext) {
        self.codes.remove(&context);
    }

    pub fn clear_all(&mut self) {
        self.codes.clear();
    }

    pub fn record(&mut self, context: FormContext, error: &SyncError) {
        self.codes.insert(context, error.code().to_string());
    }

    pub fn code(&self, context: FormContext) -> Option<&str> {
        self.codes.get(&context).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorSlots, FormContext};
    use crate::service::error::SyncError;

    #[test]
    fn recording_replaces_previous_code_in_same_context() {
        let mut slots = ErrorSlots::default();
        slots.record(FormContext::AddTask, &SyncError::DuplicateName("x".to_string()));
        slots.record(FormContext::AddTask, &SyncError::NotLoggedIn);
        slots.record(FormContext::Profile, &SyncError::TransientIo("down".to_string()));

        assert_eq!(slots.code(FormContext::AddTask), Some("not_logged_in"));
        assert_eq!(slots.code(FormContext::Profile), Some("transient_io"));

        slots.clear(FormContext::AddTask);
        assert_eq!(slots.code(FormContext::AddTask), None);
        assert_eq!(slots.code(FormContext::Profile), Some("transient_io"));
    }
}
