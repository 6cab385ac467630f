//! Single-slot durable cache of the current user.
//!
//! # Responsibility
//! - Persist the serialized current user for session resumption.
//! - Degrade malformed payloads to "no session" instead of failing startup.
//!
//! # Invariants
//! - `write` replaces the slot wholesale; payloads are never merged.
//! - `clear` removes the slot entirely.
//! - The cache is read once at session start and never arbitrates truth.

use crate::db::{open_cache_db, open_cache_db_in_memory, DbError};
use crate::model::user::User;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Slot key holding the serialized current user.
pub const CURRENT_USER_SLOT: &str = "current-user";

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    Encode(serde_json::Error),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "session cache storage failed: {err}"),
            Self::Encode(err) => write!(f, "session cache payload encode failed: {err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable single-slot store for the current user snapshot.
pub trait LocalCache: Send {
    /// Returns the cached user, or `None` when the slot is empty or unreadable.
    fn read(&self) -> CacheResult<Option<User>>;
    /// Atomically overwrites the slot with `user`.
    fn write(&self, user: &User) -> CacheResult<()>;
    /// Removes the slot.
    fn clear(&self) -> CacheResult<()>;
}

/// SQLite-backed session cache.
pub struct SqliteLocalCache {
    conn: Connection,
}

impl SqliteLocalCache {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        Ok(Self::new(open_cache_db(path)?))
    }

    pub fn in_memory() -> CacheResult<Self> {
        Ok(Self::new(open_cache_db_in_memory()?))
    }
}

impl LocalCache for SqliteLocalCache {
    fn read(&self) -> CacheResult<Option<User>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM session_cache WHERE slot = ?1;",
                [CURRENT_USER_SLOT],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        match serde_json::from_str::<User>(&payload) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                warn!(
                    "event=cache_read module=cache status=degraded slot={CURRENT_USER_SLOT} error_code=malformed_payload error={err}"
                );
                Ok(None)
            }
        }
    }

    fn write(&self, user: &User) -> CacheResult<()> {
        let payload = serde_json::to_string(user).map_err(CacheError::Encode)?;
        self.conn.execute(
            "INSERT INTO session_cache (slot, payload, written_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(slot) DO UPDATE SET
                payload = excluded.payload,
                written_at = excluded.written_at;",
            params![CURRENT_USER_SLOT, payload],
        )?;
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.conn.execute(
            "DELETE FROM session_cache WHERE slot = ?1;",
            [CURRENT_USER_SLOT],
        )?;
        Ok(())
    }
}
