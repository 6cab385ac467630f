//! SQLite bootstrap for the local session cache file.
//!
//! # Responsibility
//! - Open file-backed or in-memory connections for the cache.
//! - Apply schema migrations before any cache read or write.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - A database written by a newer binary is rejected, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_cache_db, open_cache_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or migrating the session cache database.
#[derive(Debug)]
pub enum DbError {
    /// The cache file (or in-memory database) could not be opened.
    Open {
        target: String,
        source: rusqlite::Error,
    },
    /// A statement against an open cache database failed.
    Sqlite(rusqlite::Error),
    /// The cache was written by a binary with a newer schema.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { target, source } => {
                write!(f, "cannot open session cache `{target}`: {source}")
            }
            Self::Sqlite(err) => write!(f, "session cache query failed: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "session cache schema v{found} is newer than this build (v{supported}); refusing to downgrade"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
