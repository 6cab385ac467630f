//! Pure task-array derivations.
//!
//! Every function takes the pre-mutation task list and returns a new list;
//! inputs are never modified. Targets are resolved by `id` only.

use crate::model::task::{SubTask, Task};
use crate::service::error::{MissingEntity, SyncError, SyncResult};

/// Flips `selected` on `task_id` and forces it off on every other task, in
/// one pass. At most one task is selected in the result.
pub fn toggle_selection(tasks: &[Task], task_id: &str) -> SyncResult<Vec<Task>> {
    ensure_task(tasks, task_id)?;
    Ok(tasks
        .iter()
        .map(|task| Task {
            selected: task.id == task_id && !task.selected,
            ..task.clone()
        })
        .collect())
}

/// Appends `task` at the end of the list.
pub fn append_task(tasks: &[Task], task: Task) -> Vec<Task> {
    let mut next = tasks.to_vec();
    next.push(task);
    next
}

/// Replaces the task with `task_id` by `update(task)`.
pub fn update_task(
    tasks: &[Task],
    task_id: &str,
    update: impl FnOnce(&Task) -> SyncResult<Task>,
) -> SyncResult<Vec<Task>> {
    let index = ensure_task(tasks, task_id)?;
    let mut next = tasks.to_vec();
    next[index] = update(&tasks[index])?;
    Ok(next)
}

/// Removes exactly the task with `task_id`.
pub fn remove_task(tasks: &[Task], task_id: &str) -> SyncResult<Vec<Task>> {
    ensure_task(tasks, task_id)?;
    Ok(tasks
        .iter()
        .filter(|task| task.id != task_id)
        .cloned()
        .collect())
}

/// Returns a copy of `task` with `sub_task` appended.
pub fn push_sub_task(task: &Task, sub_task: SubTask) -> Task {
    let mut next = task.clone();
    next.sub_tasks.push(sub_task);
    next
}

/// Returns a copy of `task` with the completion of `sub_task_id` flipped.
pub fn toggle_sub_task(task: &Task, sub_task_id: &str) -> SyncResult<Task> {
    ensure_sub_task(task, sub_task_id)?;
    let mut next = task.clone();
    for sub_task in next.sub_tasks.iter_mut().filter(|s| s.id == sub_task_id) {
        *sub_task = sub_task.toggled();
    }
    Ok(next)
}

/// Returns a copy of `task` without `sub_task_id`.
pub fn remove_sub_task(task: &Task, sub_task_id: &str) -> SyncResult<Task> {
    ensure_sub_task(task, sub_task_id)?;
    let mut next = task.clone();
    next.sub_tasks.retain(|sub_task| sub_task.id != sub_task_id);
    Ok(next)
}

fn ensure_task(tasks: &[Task], task_id: &str) -> SyncResult<usize> {
    tasks
        .iter()
        .position(|task| task.id == task_id)
        .ok_or_else(|| SyncError::NotFound(MissingEntity::Task(task_id.to_string())))
}

fn ensure_sub_task(task: &Task, sub_task_id: &str) -> SyncResult<()> {
    match task.sub_task(sub_task_id) {
        Some(_) => Ok(()),
        None => Err(SyncError::NotFound(MissingEntity::SubTask {
            task_id: task.id.clone(),
            sub_task_id: sub_task_id.to_string(),
        })),
    }
}
