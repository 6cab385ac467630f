use crate::model::task::{Task, TaskId};
use crate::model::user::{ProfileDetails, Uid, User};
use crate::repo::session_cache::{CacheResult, LocalCache};
use log::{debug, warn};

/// Closed set of state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Replaces the whole user collection after a full fetch.
    Initialize(Vec<User>),
    /// Replaces the current user and rewrites the session cache.
    SetCurrentUser(User),
    /// Replaces the task array of the matching user.
    UpdateTasks { uid: Uid, tasks: Vec<Task> },
    /// Merges profile fields into the matching user.
    UpdateProfile { uid: Uid, details: ProfileDetails },
    /// Appends a newly signed-up user. No uniqueness re-check.
    AddUser(User),
    /// Sets or clears the selected task.
    SelectTask(Option<TaskId>),
    SetLoadingSelection(bool),
    /// Tears the session down and clears the session cache.
    ClearSession,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "initialize",
            Self::SetCurrentUser(_) => "set_current_user",
            Self::UpdateTasks { .. } => "update_tasks",
            Self::UpdateProfile { .. } => "update_profile",
            Self::AddUser(_) => "add_user",
            Self::SelectTask(_) => "select_task",
            Self::SetLoadingSelection(_) => "set_loading_selection",
            Self::ClearSession => "clear_session",
        }
    }
}

/// Snapshot of the session model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub all_users: Vec<User>,
    pub current_user: Option<User>,
    /// Id of the selected task in `current_user`.
    pub selected_task: Option<TaskId>,
    pub loading_selection: bool,
}

impl SessionState {
    /// Pure transition function.
    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::Initialize(users) => {
                if let Some(current) = self.current_user.as_mut() {
                    if let Some(fetched) = users.iter().find(|user| user.uid == current.uid) {
                        *current = fetched.clone();
                    }
                }
                self.all_users = users;
            }
            Action::SetCurrentUser(user) => {
                self.current_user = Some(user);
            }
            Action::UpdateTasks { uid, tasks } => {
                if let Some(user) = self.all_users.iter_mut().find(|user| user.uid == uid) {
                    user.tasks = tasks.clone();
                }
                if let Some(current) = self.current_user.as_mut().filter(|user| user.uid == uid) {
                    current.tasks = tasks;
                }
            }
            Action::UpdateProfile { uid, details } => {
                for user in self.all_users.iter_mut().filter(|user| user.uid == uid) {
                    *user = user.with_profile(&details);
                }
                if let Some(current) = self.current_user.as_mut().filter(|user| user.uid == uid) {
                    *current = current.with_profile(&details);
                }
            }
            Action::AddUser(user) => {
                self.all_users.push(user);
            }
            Action::SelectTask(task_id) => {
                self.selected_task = task_id;
            }
            Action::SetLoadingSelection(loading) => {
                self.loading_selection = loading;
            }
            Action::ClearSession => {
                self.current_user = None;
                self.selected_task = None;
                self.loading_selection = false;
            }
        }

        // A selection always refers to a task the current user still owns.
        let selection_vanished = match (&self.selected_task, &self.current_user) {
            (Some(task_id), Some(user)) => user.task(task_id).is_none(),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if selection_vanished {
            self.selected_task = None;
        }
        self
    }
}

/// Single owner of the session model and its durable cache.
///
/// `confirmed` mirrors the cache slot: the current user as last accepted by
/// the remote store. It never carries optimistic, unconfirmed edits.
pub struct StateStore {
    state: SessionState,
    confirmed: Option<User>,
    cache: Box<dyn LocalCache>,
}

impl StateStore {
    /// Creates an empty store.
    pub fn new(cache: Box<dyn LocalCache>) -> Self {
        Self {
            state: SessionState::default(),
            confirmed: None,
            cache,
        }
    }

    /// Creates a store seeded from the session cache.
    ///
    /// An unreadable cache degrades to "no session".
    pub fn restore(cache: Box<dyn LocalCache>) -> Self {
        let mut store = Self::new(cache);
        match store.cache.read() {
            Ok(Some(user)) => {
                debug!(
                    "event=session_restore module=state status=ok uid={}",
                    user.uid
                );
                store.state.selected_task = user.selected_task().map(|task| task.id.clone());
                store.confirmed = Some(user.clone());
                store.state.current_user = Some(user);
            }
            Ok(None) => {
                debug!("event=session_restore module=state status=ok session=none");
            }
            Err(err) => {
                warn!(
                    "event=session_restore module=state status=degraded error_code=cache_read_failed error={err}"
                );
            }
        }
        store
    }

    /// Applies one action.
    ///
    /// The in-memory transition always happens. The returned error only
    /// reports a failed cache side effect.
    pub fn apply(&mut self, action: Action) -> CacheResult<&SessionState> {
        let name = action.name();
        let cache_effect = match &action {
            Action::SetCurrentUser(user) => Some(CacheEffect::Write(user.clone())),
            Action::ClearSession => Some(CacheEffect::Clear),
            Action::Initialize(users) => {
                if let Some(current) = self.state.current_user.as_ref() {
                    if !users.iter().any(|user| user.uid == current.uid) {
                        warn!(
                            "event=state_initialize module=state status=degraded uid={} error_code=current_user_missing_remotely",
                            current.uid
                        );
                    }
                }
                None
            }
            _ => None,
        };

        let previous = std::mem::take(&mut self.state);
        self.state = previous.reduce(action);
        debug!("event=state_apply module=state status=ok action={name}");

        match cache_effect {
            Some(CacheEffect::Write(user)) => {
                self.confirmed = Some(user.clone());
                self.cache.write(&user)?;
            }
            Some(CacheEffect::Clear) => {
                self.confirmed = None;
                self.cache.clear()?;
            }
            None => {}
        }
        Ok(&self.state)
    }

    /// Records a remote write accepted for `uid` and rewrites the cache.
    ///
    /// `patch` receives the last confirmed user and returns it with only the
    /// written fields changed. In-memory state is left untouched. No-op when
    /// no confirmed user with `uid` exists.
    pub fn confirm_write(
        &mut self,
        uid: &str,
        patch: impl FnOnce(&User) -> User,
    ) -> CacheResult<()> {
        let Some(base) = self.confirmed.as_ref().filter(|user| user.uid == uid) else {
            return Ok(());
        };
        let next = patch(base);
        self.cache.write(&next)?;
        debug!("event=cache_confirm module=state status=ok uid={uid}");
        self.confirmed = Some(next);
        Ok(())
    }

    /// Current user as last confirmed by the remote store.
    pub fn confirmed_user(&self) -> Option<&User> {
        self.confirmed.as_ref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn all_users(&self) -> &[User] {
        &self.state.all_users
    }

    pub fn current_user(&self) -> Option<&User> {
        self.state.current_user.as_ref()
    }

    /// Resolves the selected task id against the current user's tasks.
    pub fn selected_task(&self) -> Option<&Task> {
        let task_id = self.state.selected_task.as_deref()?;
        self.current_user()?.task(task_id)
    }

    pub fn loading_selection(&self) -> bool {
        self.state.loading_selection
    }
}

enum CacheEffect {
    Write(User),
    Clear,
}
