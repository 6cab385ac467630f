//! Optimistic synchronization engine.
//!
//! # Responsibility
//! - Run every user-triggered mutation as derive, commit, persist:
//!   1. derive the new value from the current `StateStore` snapshot,
//!   2. commit it through `StateStore::apply` before any network call,
//!   3. persist it through the `RemoteStore`.
//! - Refresh the session cache only after the remote write succeeded, and
//!   only with the fields that write carried.
//! - Track one error code per form context.
//!
//! # Consistency model
//! - At-most-once writes without rollback: when the remote write fails the
//!   error is returned and the optimistic state stays in memory until the
//!   next `refresh` (full fetch + `Initialize`).
//! - Overlapping operations are not coordinated; the remote write that
//!   completes last wins.
//!
//! # Invariants
//! - The store lock is never held across an `.await`.
//! - Validation failures never mutate state.
//! - The session cache holds remotely confirmed data only: fetched records
//!   patched with accepted writes, never a rejected optimistic edit.

use crate::auth::CredentialProvider;
use crate::model::id::{IdGenerator, RandomIdGenerator};
use crate::model::task::{SubTask, Task, TaskId};
use crate::model::user::{ProfileDetails, User};
use crate::repo::remote_store::RemoteStore;
use crate::repo::session_cache::LocalCache;
use crate::service::error::{MissingEntity, SyncError, SyncResult};
use crate::service::error_slots::{ErrorSlots, FormContext};
use crate::service::task_ops::{
    append_task, push_sub_task, remove_sub_task, remove_task, toggle_selection, toggle_sub_task,
    update_task,
};
use crate::service::validation::{
    validate_new_task, validate_profile, validate_sub_task_desc, validate_task_fields, TaskDraft,
};
use crate::state::{Action, SessionState, StateStore};
use chrono::Utc;
use log::{info, warn};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Client-side sync core over a remote store and a credential provider.
pub struct SyncEngine<R: RemoteStore, C: CredentialProvider> {
    remote: R,
    credentials: C,
    ids: Box<dyn IdGenerator>,
    store: Mutex<StateStore>,
    errors: Mutex<ErrorSlots>,
}

impl<R: RemoteStore, C: CredentialProvider> SyncEngine<R, C> {
    /// Creates an engine whose session is seeded from `cache`.
    pub fn new(remote: R, credentials: C, cache: Box<dyn LocalCache>) -> Self {
        Self::with_store(remote, credentials, StateStore::restore(cache))
    }

    /// Creates an engine around an existing store.
    pub fn with_store(remote: R, credentials: C, store: StateStore) -> Self {
        Self {
            remote,
            credentials,
            ids: Box::new(RandomIdGenerator),
            store: Mutex::new(store),
            errors: Mutex::new(ErrorSlots::default()),
        }
    }

    /// Replaces the identifier source for new tasks and sub-tasks.
    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn snapshot(&self) -> SessionState {
        self.store().state().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.store().current_user().cloned()
    }

    pub fn selected_task(&self) -> Option<Task> {
        self.store().selected_task().cloned()
    }

    pub fn loading_selection(&self) -> bool {
        self.store().loading_selection()
    }

    /// Active error code for `context`, if the last operation there failed.
    pub fn error_code(&self, context: FormContext) -> Option<String> {
        self.errors().code(context).map(str::to_string)
    }

    /// One-time startup fetch of the user collection.
    pub async fn start_session(&self) -> SyncResult<()> {
        self.tracked(FormContext::Session, "start_session", self.reconcile())
            .await
    }

    /// Full refetch; the only reconciliation path after a failed write.
    pub async fn refresh(&self) -> SyncResult<()> {
        self.tracked(FormContext::Session, "refresh", self.reconcile())
            .await
    }

    /// Registers credentials and creates the user document.
    ///
    /// The new user is appended to the in-memory collection without a uid
    /// uniqueness check; a duplicate is only logged. A `DuplicateKey` from
    /// the remote store is returned like any other write failure: the
    /// appended user stays until the next `refresh`.
    pub async fn sign_up(&self, email: &str, password: &str) -> SyncResult<User> {
        self.tracked(FormContext::Auth, "sign_up", async {
            let identity = self.credentials.sign_up(email, password).await?;
            let user = User::signed_up(identity.uid, identity.email, Utc::now());
            {
                let mut store = self.store();
                if store.all_users().iter().any(|known| known.uid == user.uid) {
                    warn!(
                        "event=sign_up module=sync status=warning uid={} error_code=uid_already_in_memory",
                        user.uid
                    );
                }
                store.apply(Action::AddUser(user.clone()))?;
            }
            self.remote.create_user(&user).await?;
            Ok(user)
        })
        .await
    }

    /// Authenticates and makes the freshly fetched matching user current.
    pub async fn log_in(&self, email: &str, password: &str) -> SyncResult<User> {
        self.tracked(FormContext::Auth, "log_in", async {
            let identity = self.credentials.sign_in(email, password).await?;
            let users = self.remote.fetch_all().await?;
            let user = users
                .iter()
                .find(|user| user.uid == identity.uid)
                .cloned()
                .ok_or_else(|| SyncError::NotFound(MissingEntity::User(identity.uid.clone())))?;

            let mut store = self.store();
            store.apply(Action::Initialize(users))?;
            let selected = user.selected_task().map(|task| task.id.clone());
            store.apply(Action::SetCurrentUser(user.clone()))?;
            store.apply(Action::SelectTask(selected))?;
            Ok(user)
        })
        .await
    }

    /// Tears the session down and clears the session cache.
    pub fn log_out(&self) -> SyncResult<()> {
        self.errors().clear_all();
        self.store().apply(Action::ClearSession)?;
        info!("event=log_out module=sync status=ok");
        Ok(())
    }

    /// Adds a header task after the ordered add-task checks.
    pub async fn add_task(&self, draft: TaskDraft) -> SyncResult<Task> {
        self.tracked(FormContext::AddTask, "add_task", async {
            let user = self.require_current_user()?;
            let due_date = validate_new_task(&user.tasks, &draft)?;
            let task = Task::new(self.ids.generate(), draft.task_name, due_date, draft.desc);
            let tasks = append_task(&user.tasks, task.clone());
            self.commit_tasks(&user, tasks, None).await?;
            Ok(task)
        })
        .await
    }

    /// Rewrites name, due date and description of one task.
    ///
    /// Identity, selection and sub-tasks are kept. Names are not re-checked
    /// for uniqueness.
    pub async fn edit_task(&self, task_id: &str, draft: TaskDraft) -> SyncResult<Task> {
        self.tracked(FormContext::EditTask, "edit_task", async {
            let user = self.require_current_user()?;
            let tasks = update_task(&user.tasks, task_id, |task| {
                let due_date = validate_task_fields(&draft)?;
                Ok(Task {
                    task_name: draft.task_name.clone(),
                    due_date,
                    desc: draft.desc.clone(),
                    ..task.clone()
                })
            })?;
            let edited = find_task(&tasks, task_id)?;
            self.commit_tasks(&user, tasks, None).await?;
            Ok(edited)
        })
        .await
    }

    /// Removes one task and its sub-tasks; clears the selection if it was
    /// the selected task.
    pub async fn delete_task(&self, task_id: &str) -> SyncResult<()> {
        self.tracked(FormContext::TaskList, "delete_task", async {
            let user = self.require_current_user()?;
            let tasks = remove_task(&user.tasks, task_id)?;
            let was_selected = self.store().state().selected_task.as_deref() == Some(task_id);
            let selection = was_selected.then_some(None);
            self.commit_tasks(&user, tasks, selection).await
        })
        .await
    }

    /// Toggles selection of one task and unselects every other task.
    ///
    /// Returns the task that is selected afterwards, if any.
    pub async fn select_task(&self, task_id: &str) -> SyncResult<Option<Task>> {
        self.tracked(FormContext::TaskList, "select_task", async {
            let user = self.require_current_user()?;
            let tasks = toggle_selection(&user.tasks, task_id)?;
            let selected = tasks.iter().find(|task| task.selected).cloned();
            let selection = selected.as_ref().map(|task| task.id.clone());

            self.store().apply(Action::SetLoadingSelection(true))?;
            let result = self.commit_tasks(&user, tasks, Some(selection)).await;
            self.store().apply(Action::SetLoadingSelection(false))?;
            result.map(|()| selected)
        })
        .await
    }

    pub async fn add_sub_task(&self, task_id: &str, desc: &str) -> SyncResult<SubTask> {
        self.tracked(FormContext::SubTask, "add_sub_task", async {
            let user = self.require_current_user()?;
            validate_sub_task_desc(desc)?;
            let sub_task = SubTask::new(self.ids.generate(), desc);
            let tasks = update_task(&user.tasks, task_id, |task| {
                Ok(push_sub_task(task, sub_task.clone()))
            })?;
            self.commit_tasks(&user, tasks, None).await?;
            Ok(sub_task)
        })
        .await
    }

    /// Flips completion of one sub-task and returns its new state.
    pub async fn toggle_sub_task(&self, task_id: &str, sub_task_id: &str) -> SyncResult<SubTask> {
        self.tracked(FormContext::SubTask, "toggle_sub_task", async {
            let user = self.require_current_user()?;
            let tasks = update_task(&user.tasks, task_id, |task| {
                toggle_sub_task(task, sub_task_id)
            })?;
            let toggled = find_task(&tasks, task_id)?
                .sub_task(sub_task_id)
                .cloned()
                .ok_or_else(|| {
                    SyncError::NotFound(MissingEntity::SubTask {
                        task_id: task_id.to_string(),
                        sub_task_id: sub_task_id.to_string(),
                    })
                })?;
            self.commit_tasks(&user, tasks, None).await?;
            Ok(toggled)
        })
        .await
    }

    pub async fn delete_sub_task(&self, task_id: &str, sub_task_id: &str) -> SyncResult<()> {
        self.tracked(FormContext::SubTask, "delete_sub_task", async {
            let user = self.require_current_user()?;
            let tasks = update_task(&user.tasks, task_id, |task| {
                remove_sub_task(task, sub_task_id)
            })?;
            self.commit_tasks(&user, tasks, None).await
        })
        .await
    }

    /// Partially updates username and phone number.
    pub async fn edit_profile(&self, details: ProfileDetails) -> SyncResult<()> {
        self.tracked(FormContext::Profile, "edit_profile", async {
            let user = self.require_current_user()?;
            validate_profile(&details)?;
            self.store().apply(Action::UpdateProfile {
                uid: user.uid.clone(),
                details: details.clone(),
            })?;
            if let Err(err) = self.remote.update_profile(&user.uid, &details).await {
                log_kept_optimistic_state("update_profile", &user.uid);
                return Err(err.into());
            }
            self.store()
                .confirm_write(&user.uid, |confirmed| confirmed.with_profile(&details))?;
            Ok(())
        })
        .await
    }

    async fn reconcile(&self) -> SyncResult<()> {
        let users = self.remote.fetch_all().await?;
        let mut store = self.store();
        let fetched_current = store
            .current_user()
            .and_then(|current| users.iter().find(|user| user.uid == current.uid))
            .cloned();
        store.apply(Action::Initialize(users))?;
        if let Some(current) = fetched_current {
            store.apply(Action::SetCurrentUser(current))?;
        }
        Ok(())
    }

    /// Commits `tasks` optimistically, then overwrites them remotely.
    ///
    /// `selection` of `Some(..)` also sets the selected task.
    async fn commit_tasks(
        &self,
        user: &User,
        tasks: Vec<Task>,
        selection: Option<Option<TaskId>>,
    ) -> SyncResult<()> {
        {
            let mut store = self.store();
            store.apply(Action::UpdateTasks {
                uid: user.uid.clone(),
                tasks: tasks.clone(),
            })?;
            if let Some(selection) = selection {
                store.apply(Action::SelectTask(selection))?;
            }
        }

        if let Err(err) = self.remote.replace_tasks(&user.uid, &tasks).await {
            log_kept_optimistic_state("replace_tasks", &user.uid);
            return Err(err.into());
        }
        self.store()
            .confirm_write(&user.uid, |confirmed| confirmed.with_tasks(tasks))?;
        Ok(())
    }

    fn require_current_user(&self) -> SyncResult<User> {
        self.store()
            .current_user()
            .cloned()
            .ok_or(SyncError::NotLoggedIn)
    }

    async fn tracked<T>(
        &self,
        context: FormContext,
        operation: &'static str,
        work: impl Future<Output = SyncResult<T>>,
    ) -> SyncResult<T> {
        self.errors().clear(context);
        let started_at = Instant::now();
        info!("event={operation} module=sync status=start");

        let result = work.await;
        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => info!("event={operation} module=sync status=ok duration_ms={duration_ms}"),
            Err(err) => {
                self.errors().record(context, err);
                warn!(
                    "event={operation} module=sync status=error duration_ms={duration_ms} error_code={}",
                    err.code()
                );
            }
        }
        result
    }

    fn store(&self) -> MutexGuard<'_, StateStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn errors(&self) -> MutexGuard<'_, ErrorSlots> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn find_task(tasks: &[Task], task_id: &str) -> SyncResult<Task> {
    tasks
        .iter()
        .find(|task| task.id == task_id)
        .cloned()
        .ok_or_else(|| SyncError::NotFound(MissingEntity::Task(task_id.to_string())))
}

fn log_kept_optimistic_state(write: &str, uid: &str) {
    warn!("event=remote_write module=sync status=error write={write} uid={uid} rollback=none");
}
