//! Connection bootstrap for the cache database.
//!
//! # Invariants
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens (or creates) the cache database file.
///
/// # Side effects
/// - Emits `cache_db_open` events with duration and status.
pub fn open_cache_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with("file", &path.display().to_string(), || Connection::open(path))
}

/// Opens a throwaway in-memory cache database.
pub fn open_cache_db_in_memory() -> DbResult<Connection> {
    open_with("memory", ":memory:", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    target: &str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=cache_db_open module=db status=start mode={mode}");

    let result = connect()
        .map_err(|source| DbError::Open {
            target: target.to_string(),
            source,
        })
        .and_then(|mut conn| bootstrap(&mut conn).map(|()| conn));

    match &result {
        Ok(_) => info!(
            "event=cache_db_open module=db status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=cache_db_open module=db status=error mode={mode} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
    result
}

fn bootstrap(conn: &mut Connection) -> DbResult<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)
}
