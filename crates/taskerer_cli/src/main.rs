//! Demo entry point.
//!
//! # Responsibility
//! - Wire `taskerer_core` with the in-memory adapters and the SQLite cache.
//! - Walk one user through sign-up, tasks, selection and sub-tasks, then
//!   print the derived task status.

use chrono::Local;
use log::info;
use std::error::Error;
use taskerer_core::{
    core_version, init_logging, CoreConfig, InMemoryCredentialProvider, InMemoryRemoteStore,
    SqliteLocalCache, SyncEngine, Task, TaskDraft,
};

const DEMO_EMAIL: &str = "demo@taskerer.local";
const DEMO_PASSWORD: &str = "demo-password";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("taskerer: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env();
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok version={}",
        core_version()
    );
    println!("taskerer_core version={}", core_version());
    println!("session cache: {}", config.cache_path.display());

    let cache = SqliteLocalCache::open(&config.cache_path)?;
    let engine = SyncEngine::new(
        InMemoryRemoteStore::new(),
        InMemoryCredentialProvider::new(),
        Box::new(cache),
    );
    if let Some(previous) = engine.current_user() {
        println!(
            "resumed cached session uid={} tasks={}",
            previous.uid,
            previous.tasks.len()
        );
        engine.log_out()?;
    }

    engine.start_session().await?;
    let user = engine.sign_up(DEMO_EMAIL, DEMO_PASSWORD).await?;
    engine.log_in(DEMO_EMAIL, DEMO_PASSWORD).await?;
    println!("signed up and logged in uid={}", user.uid);

    let study = engine
        .add_task(TaskDraft::new("Study", "2099-01-01", "read"))
        .await?;
    engine
        .add_task(TaskDraft::new("Taxes", "2001-04-15", "file the return"))
        .await?;
    engine.select_task(&study.id).await?;
    let chapter = engine.add_sub_task(&study.id, "chapter1").await?;
    engine.add_sub_task(&study.id, "chapter2").await?;
    engine.toggle_sub_task(&study.id, &chapter.id).await?;

    let today = Local::now().date_naive();
    let selected_id = engine.selected_task().map(|task| task.id);
    for task in engine.current_user().map(|user| user.tasks).unwrap_or_default() {
        print_task(&task, today, selected_id.as_deref() == Some(task.id.as_str()));
    }
    Ok(())
}

fn print_task(task: &Task, today: chrono::NaiveDate, selected: bool) {
    let progress = task
        .progress()
        .map_or_else(|| "-".to_string(), |percent| format!("{percent}%"));
    println!(
        "{marker} {name:<20} due={due} progress={progress} concluded={concluded} past_due={past_due}",
        marker = if selected { "*" } else { " " },
        name = task.task_name,
        due = task.due_date,
        concluded = task.is_concluded(),
        past_due = task.is_past_due(today),
    );
}
