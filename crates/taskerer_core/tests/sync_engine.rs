use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use taskerer_core::{
    FormContext, IdGenerator, InMemoryCredentialProvider, InMemoryRemoteStore, LocalCache,
    MissingEntity, ProfileDetails, RemoteError, SqliteLocalCache, SubTask, SyncEngine, SyncError,
    Task, TaskDraft, User, ValidationError,
};

type Engine = SyncEngine<InMemoryRemoteStore, InMemoryCredentialProvider>;

const EMAIL: &str = "ana@example.com";
const PASSWORD: &str = "secret1";
const CACHE_FILE: &str = "session.db";

struct SequentialIds {
    prefix: &'static str,
    next: AtomicUsize,
}

impl SequentialIds {
    fn boxed(prefix: &'static str) -> Box<dyn IdGenerator> {
        Box::new(Self {
            prefix,
            next: AtomicUsize::new(1),
        })
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("{}{}", self.prefix, self.next.fetch_add(1, Ordering::SeqCst))
    }
}

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn task(id: &str, name: &str) -> Task {
    Task::new(id, name, day(2099, 1, 1), "desc")
}

fn cached_user(dir: &Path) -> Option<User> {
    SqliteLocalCache::open(dir.join(CACHE_FILE))
        .unwrap()
        .read()
        .unwrap()
}

fn empty_engine(dir: &Path) -> Engine {
    let credentials = InMemoryCredentialProvider::with_id_generator(SequentialIds::boxed("u"));
    let cache = SqliteLocalCache::open(dir.join(CACHE_FILE)).unwrap();
    SyncEngine::new(InMemoryRemoteStore::new(), credentials, Box::new(cache))
        .with_id_generator(SequentialIds::boxed("id-"))
}

/// Engine logged in as `u1`, whose remote document holds `tasks`.
async fn seeded_engine(dir: &Path, tasks: Vec<Task>) -> Engine {
    let user = User::signed_up("u1", EMAIL, created_at()).with_tasks(tasks);
    let remote = InMemoryRemoteStore::with_users([user]).unwrap();
    let credentials = InMemoryCredentialProvider::new();
    credentials.register("u1", EMAIL, PASSWORD);
    let cache = SqliteLocalCache::open(dir.join(CACHE_FILE)).unwrap();

    let engine = SyncEngine::new(remote, credentials, Box::new(cache))
        .with_id_generator(SequentialIds::boxed("id-"));
    engine.start_session().await.unwrap();
    engine.log_in(EMAIL, PASSWORD).await.unwrap();
    engine
}

fn current_tasks(engine: &Engine) -> Vec<Task> {
    engine.current_user().unwrap().tasks
}

fn remote_tasks(engine: &Engine) -> Vec<Task> {
    engine.remote().user("u1").unwrap().unwrap().tasks
}

#[tokio::test]
async fn study_scenario_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let engine = empty_engine(dir.path());
    engine.start_session().await.unwrap();

    let user = engine.sign_up(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(user.uid, "u1");
    assert!(user.tasks.is_empty());
    assert!(user.needs_profile_details());
    assert!(engine.current_user().is_none());

    engine.log_in(EMAIL, PASSWORD).await.unwrap();
    let study = engine
        .add_task(TaskDraft::new("Study", "2099-01-01", "read"))
        .await
        .unwrap();
    assert_eq!(current_tasks(&engine), vec![study.clone()]);

    let selected = engine.select_task(&study.id).await.unwrap().unwrap();
    assert!(selected.selected);
    assert_eq!(engine.selected_task().unwrap().id, study.id);
    assert!(!engine.loading_selection());

    let chapter = engine.add_sub_task(&study.id, "chapter1").await.unwrap();
    assert_eq!(
        engine.selected_task().unwrap().sub_tasks,
        vec![SubTask::new(chapter.id.clone(), "chapter1")]
    );

    let done = engine.toggle_sub_task(&study.id, &chapter.id).await.unwrap();
    assert!(done.completed);

    let study = engine.selected_task().unwrap();
    assert!(study.is_concluded());
    assert_eq!(study.progress(), Some(100));
    assert!(!study.is_past_due(day(2099, 1, 1)));

    assert_eq!(remote_tasks(&engine), vec![study.clone()]);
    assert_eq!(cached_user(dir.path()).unwrap().tasks, vec![study]);
}

#[tokio::test]
async fn duplicate_name_wins_over_leading_whitespace_and_leaves_tasks_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(dir.path(), vec![task("a", " Study")]).await;
    let before = current_tasks(&engine);

    let err = engine
        .add_task(TaskDraft::new(" Study", "2099-01-01", "read"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::DuplicateName(ref name) if name == " Study"));
    assert_eq!(current_tasks(&engine), before);
    assert_eq!(remote_tasks(&engine), before);
    assert_eq!(
        engine.error_code(FormContext::AddTask).as_deref(),
        Some("duplicate_task_name")
    );
}

#[tokio::test]
async fn invalid_input_is_rejected_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(dir.path(), vec![task("a", "Study")]).await;
    let before = current_tasks(&engine);

    let err = engine
        .add_task(TaskDraft::new("Gym", "2099-01-01", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::EmptyFields)));

    let err = engine.add_sub_task("a", " chapter").await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::LeadingWhitespace)));

    assert_eq!(current_tasks(&engine), before);
    assert_eq!(remote_tasks(&engine), before);
}

#[tokio::test]
async fn selection_keeps_at_most_one_task_selected() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = task("a", "First");
    first.selected = true;
    let mut third = task("c", "Third");
    third.selected = true;
    let engine = seeded_engine(dir.path(), vec![first, task("b", "Second"), third]).await;

    engine.select_task("b").await.unwrap();
    let selected: Vec<_> = current_tasks(&engine)
        .into_iter()
        .filter(|task| task.selected)
        .map(|task| task.id)
        .collect();
    assert_eq!(selected, vec!["b".to_string()]);
    assert_eq!(remote_tasks(&engine), current_tasks(&engine));

    let after_second_toggle = engine.select_task("b").await.unwrap();
    assert!(after_second_toggle.is_none());
    assert!(engine.selected_task().is_none());
    assert!(current_tasks(&engine).iter().all(|task| !task.selected));
}

#[tokio::test]
async fn deleting_the_selected_task_clears_selection_and_keeps_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let mut second = task("b", "Second");
    second.sub_tasks.push(SubTask::new("s1", "keep"));
    let engine =
        seeded_engine(dir.path(), vec![task("a", "First"), second, task("c", "Third")]).await;
    engine.select_task("a").await.unwrap();
    let before = current_tasks(&engine);

    engine.delete_task("a").await.unwrap();

    assert!(engine.selected_task().is_none());
    assert_eq!(current_tasks(&engine), before[1..].to_vec());
    assert_eq!(remote_tasks(&engine), before[1..].to_vec());

    let err = engine.delete_task("a").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(MissingEntity::Task(ref id)) if id == "a"));
}

#[tokio::test]
async fn toggling_a_sub_task_twice_restores_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut study = task("a", "Study");
    study.sub_tasks = vec![SubTask::new("s1", "chapter1"), SubTask::new("s2", "chapter2")];
    let engine = seeded_engine(dir.path(), vec![study.clone()]).await;

    engine.toggle_sub_task("a", "s2").await.unwrap();
    assert_eq!(engine.current_user().unwrap().tasks[0].progress(), Some(50));
    engine.toggle_sub_task("a", "s2").await.unwrap();

    assert_eq!(current_tasks(&engine), vec![study.clone()]);
    assert_eq!(remote_tasks(&engine), vec![study]);

    engine.delete_sub_task("a", "s1").await.unwrap();
    assert_eq!(
        current_tasks(&engine)[0].sub_tasks,
        vec![SubTask::new("s2", "chapter2")]
    );
}

#[tokio::test]
async fn editing_keeps_identity_selection_and_sub_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let mut study = task("a", "Study");
    study.sub_tasks.push(SubTask::new("s1", "chapter1"));
    let engine = seeded_engine(dir.path(), vec![study, task("b", "Gym")]).await;
    engine.select_task("a").await.unwrap();

    // Renaming onto an existing name is allowed when editing.
    let edited = engine
        .edit_task("a", TaskDraft::new("Gym", "2099-03-04", "legs"))
        .await
        .unwrap();

    assert_eq!(edited.id, "a");
    assert_eq!(edited.task_name, "Gym");
    assert_eq!(edited.due_date, day(2099, 3, 4));
    assert!(edited.selected);
    assert_eq!(edited.sub_tasks, vec![SubTask::new("s1", "chapter1")]);
    assert_eq!(engine.selected_task(), Some(edited));

    let err = engine
        .edit_task("a", TaskDraft::new("Gym", "someday", "legs"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::InvalidDueDate(_))));
    assert_eq!(
        engine.error_code(FormContext::EditTask).as_deref(),
        Some("invalid_due_date")
    );
}

#[tokio::test]
async fn remote_failure_keeps_optimistic_state_and_previous_cache() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(dir.path(), vec![task("a", "Study")]).await;
    let confirmed = current_tasks(&engine);

    engine.remote().set_offline(true);
    let err = engine
        .add_task(TaskDraft::new("Gym", "2099-01-01", "legs"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::TransientIo(_)));
    assert_eq!(
        engine.error_code(FormContext::AddTask).as_deref(),
        Some("transient_io")
    );
    let optimistic = current_tasks(&engine);
    assert_eq!(optimistic.len(), 2);
    assert_eq!(optimistic[1].task_name, "Gym");
    assert_eq!(remote_tasks(&engine), confirmed);
    assert_eq!(cached_user(dir.path()).unwrap().tasks, confirmed);

    engine.remote().set_offline(false);
    engine.refresh().await.unwrap();
    assert_eq!(current_tasks(&engine), confirmed);
    assert_eq!(cached_user(dir.path()).unwrap().tasks, confirmed);
}

#[tokio::test]
async fn cache_only_receives_fields_the_remote_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(dir.path(), vec![task("a", "Study")]).await;

    engine
        .remote()
        .fail_next(RemoteError::TransientIo("timeout".to_string()));
    let err = engine
        .edit_profile(ProfileDetails {
            username: "ana".to_string(),
            phone_number: "5551234".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::TransientIo(_)));

    engine
        .add_task(TaskDraft::new("Gym", "2099-01-01", "legs"))
        .await
        .unwrap();

    let remote = engine.remote().user("u1").unwrap().unwrap();
    let cached = cached_user(dir.path()).unwrap();
    assert_eq!(remote.username, "Empty");
    assert_eq!(cached.username, remote.username);
    assert_eq!(cached, remote);
    // The rejected edit is not rolled back in memory.
    assert_eq!(engine.current_user().unwrap().username, "ana");

    engine.remote().set_offline(true);
    engine
        .add_task(TaskDraft::new("Cook", "2099-01-01", "dinner"))
        .await
        .unwrap_err();
    engine.remote().set_offline(false);
    engine
        .edit_profile(ProfileDetails {
            username: "bo".to_string(),
            phone_number: "1".to_string(),
        })
        .await
        .unwrap();

    let remote = engine.remote().user("u1").unwrap().unwrap();
    let cached = cached_user(dir.path()).unwrap();
    assert_eq!(remote.tasks.len(), 2);
    assert_eq!(cached, remote);
    assert_eq!(current_tasks(&engine).len(), 3);
}

#[tokio::test]
async fn duplicate_remote_document_keeps_the_appended_user_until_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let existing = User::signed_up("u1", "first@example.com", created_at());
    let remote = InMemoryRemoteStore::with_users([existing.clone()]).unwrap();
    let credentials = InMemoryCredentialProvider::with_id_generator(SequentialIds::boxed("u"));
    let cache = SqliteLocalCache::open(dir.path().join(CACHE_FILE)).unwrap();
    let engine: Engine = SyncEngine::new(remote, credentials, Box::new(cache));
    engine.start_session().await.unwrap();

    let err = engine
        .sign_up("second@example.com", PASSWORD)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::DuplicateKey(ref uid) if uid == "u1"));
    assert_eq!(
        engine.error_code(FormContext::Auth).as_deref(),
        Some("duplicate_key")
    );
    let emails: Vec<String> = engine
        .snapshot()
        .all_users
        .into_iter()
        .map(|user| user.email)
        .collect();
    assert_eq!(emails, vec!["first@example.com", "second@example.com"]);
    assert_eq!(engine.remote().user("u1").unwrap(), Some(existing.clone()));

    engine.refresh().await.unwrap();
    assert_eq!(engine.snapshot().all_users, vec![existing]);
}

#[tokio::test]
async fn failed_selection_write_still_clears_loading_flag() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(dir.path(), vec![task("a", "Study")]).await;

    engine
        .remote()
        .fail_next(RemoteError::TransientIo("timeout".to_string()));
    let err = engine.select_task("a").await.unwrap_err();

    assert!(matches!(err, SyncError::TransientIo(_)));
    assert!(!engine.loading_selection());
    assert_eq!(engine.selected_task().unwrap().id, "a");
    assert!(!remote_tasks(&engine)[0].selected);
}

#[tokio::test]
async fn starting_an_operation_clears_its_previous_error_code() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(dir.path(), vec![task("a", "Study")]).await;

    engine
        .add_task(TaskDraft::new("Study", "2099-01-01", "again"))
        .await
        .unwrap_err();
    engine.toggle_sub_task("a", "missing").await.unwrap_err();
    assert!(engine.error_code(FormContext::AddTask).is_some());
    assert_eq!(
        engine.error_code(FormContext::SubTask).as_deref(),
        Some("not_found")
    );

    engine
        .add_task(TaskDraft::new("Gym", "2099-01-01", "legs"))
        .await
        .unwrap();
    assert!(engine.error_code(FormContext::AddTask).is_none());
    assert!(engine.error_code(FormContext::SubTask).is_some());
}

#[tokio::test]
async fn mutations_require_a_logged_in_user() {
    let dir = tempfile::tempdir().unwrap();
    let engine = empty_engine(dir.path());

    let err = engine
        .add_task(TaskDraft::new("Study", "2099-01-01", "read"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotLoggedIn));
    assert_eq!(err.code(), "not_logged_in");
}

#[tokio::test]
async fn credential_errors_surface_provider_codes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(dir.path(), Vec::new()).await;

    let err = engine.log_in(EMAIL, "wrong-password").await.unwrap_err();
    assert_eq!(err.code(), "auth/invalid-credential");
    assert_eq!(
        engine.error_code(FormContext::Auth).as_deref(),
        Some("auth/invalid-credential")
    );

    let err = engine.sign_up(EMAIL, PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), "auth/email-already-in-use");
    assert_eq!(engine.snapshot().all_users.len(), 1);
}

#[tokio::test]
async fn profile_edit_merges_fields_and_checks_limits() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(dir.path(), vec![task("a", "Study")]).await;

    engine
        .edit_profile(ProfileDetails {
            username: "ana".to_string(),
            phone_number: "5551234".to_string(),
        })
        .await
        .unwrap();

    let user = engine.current_user().unwrap();
    assert_eq!(user.username, "ana");
    assert_eq!(user.phone_number, "5551234");
    assert!(!user.needs_profile_details());
    assert_eq!(user.tasks.len(), 1);
    let remote = engine.remote().user("u1").unwrap().unwrap();
    assert_eq!(remote, user);
    assert_eq!(cached_user(dir.path()), Some(user));

    let err = engine
        .edit_profile(ProfileDetails {
            username: "a-very-long-name".to_string(),
            phone_number: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "input_too_long");
    assert_eq!(engine.current_user().unwrap().username, "ana");
}

#[tokio::test]
async fn session_resumes_from_cache_and_log_out_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = seeded_engine(dir.path(), vec![task("a", "Study"), task("b", "Gym")]).await;
        engine.select_task("b").await.unwrap();
    }

    let remote_copy = cached_user(dir.path()).unwrap();
    let cache = SqliteLocalCache::open(dir.path().join(CACHE_FILE)).unwrap();
    let engine: Engine = SyncEngine::new(
        InMemoryRemoteStore::with_users([remote_copy]).unwrap(),
        InMemoryCredentialProvider::new(),
        Box::new(cache),
    );

    assert_eq!(engine.current_user().unwrap().uid, "u1");
    assert_eq!(engine.selected_task().unwrap().id, "b");

    engine.start_session().await.unwrap();
    assert_eq!(engine.snapshot().all_users.len(), 1);
    assert_eq!(engine.selected_task().unwrap().id, "b");

    engine.log_out().unwrap();
    assert!(engine.current_user().is_none());
    assert!(engine.selected_task().is_none());
    assert!(cached_user(dir.path()).is_none());
}
