//! Header task and sub-task model.
//!
//! # Responsibility
//! - Define the task records stored inside a user document.
//! - Derive progress, conclusion and past-due state for presentation.
//!
//! # Invariants
//! - `id` is immutable and the only identity of a task or sub-task.
//! - `due_date` is a calendar date; comparisons never involve time of day.
//! - Derivations are pure and never mutate the task.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Stable identifier of a header task within its user.
pub type TaskId = String;

/// Stable identifier of a sub-task within its parent task.
pub type SubTaskId = String;

/// Checklist entry owned by exactly one header task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: SubTaskId,
    pub desc: String,
    pub completed: bool,
}

impl SubTask {
    /// Creates an open (not completed) sub-task.
    pub fn new(id: impl Into<SubTaskId>, desc: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: desc.into(),
            completed: false,
        }
    }

    /// Returns a copy with `completed` flipped.
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }
}

/// Top-level task owned directly by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub task_name: String,
    /// Serialized as `YYYY-MM-DD`.
    pub due_date: NaiveDate,
    pub desc: String,
    pub selected: bool,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
}

impl Task {
    /// Creates an unselected task without sub-tasks.
    pub fn new(
        id: impl Into<TaskId>,
        task_name: impl Into<String>,
        due_date: NaiveDate,
        desc: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            task_name: task_name.into(),
            due_date,
            desc: desc.into(),
            selected: false,
            sub_tasks: Vec::new(),
        }
    }

    /// Finds one sub-task by id.
    pub fn sub_task(&self, id: &str) -> Option<&SubTask> {
        self.sub_tasks.iter().find(|sub_task| sub_task.id == id)
    }

    /// Number of completed sub-tasks.
    pub fn completed_sub_tasks(&self) -> usize {
        self.sub_tasks
            .iter()
            .filter(|sub_task| sub_task.completed)
            .count()
    }

    /// Completion percentage, floored.
    ///
    /// Returns `None` when the task has no sub-tasks: there is no progress to
    /// display, which is distinct from `Some(0)`.
    pub fn progress(&self) -> Option<u8> {
        let total = self.sub_tasks.len();
        if total == 0 {
            return None;
        }
        let percent = self.completed_sub_tasks() * 100 / total;
        u8::try_from(percent).ok()
    }

    /// True iff the task has at least one sub-task and all are completed.
    pub fn is_concluded(&self) -> bool {
        !self.sub_tasks.is_empty() && self.sub_tasks.iter().all(|sub_task| sub_task.completed)
    }

    /// True iff `due_date` is strictly before `today` and the task is not
    /// concluded.
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.due_date < today && !self.is_concluded()
    }

    /// `is_past_due` evaluated against the local calendar date.
    pub fn is_past_due_today(&self) -> bool {
        self.is_past_due(Local::now().date_naive())
    }
}
