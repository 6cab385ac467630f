//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Install the `flexi_logger` file backend behind the `log` facade once.
//! - Capture panics as sanitized, metadata-only log records.
//!
//! # Invariants
//! - A second init with the same level and directory is a no-op.
//! - A second init with another level or directory is rejected.
//! - Init never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};
use std::sync::Once;

const LOG_BASENAME: &str = "taskerer";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEPT_LOG_FILES: usize = 4;
const PANIC_SUMMARY_CHARS: usize = 120;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

struct ActiveLogger {
    level: &'static str,
    dir: PathBuf,
    _handle: LoggerHandle,
}

/// Logging bootstrap failure.
#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    /// Log directory is blank or relative.
    BadDirectory(String),
    CreateDirectory { dir: PathBuf, source: std::io::Error },
    Backend(String),
    /// Logging is already active with another level or directory.
    Conflict {
        active_level: &'static str,
        active_dir: PathBuf,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => {
                write!(f, "unknown log level `{level}` (trace|debug|info|warn|error)")
            }
            Self::BadDirectory(dir) => write!(f, "log directory must be absolute, got `{dir}`"),
            Self::CreateDirectory { dir, source } => {
                write!(f, "cannot create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(message) => write!(f, "logger backend failed: {message}"),
            Self::Conflict {
                active_level,
                active_dir,
            } => write!(
                f,
                "logging already active at `{}` with level `{active_level}`",
                active_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Starts rolling file logs under `log_dir`.
///
/// # Errors
/// - `UnknownLevel` / `BadDirectory` for unusable arguments.
/// - `Conflict` when logging is already active with other settings.
/// - `CreateDirectory` / `Backend` when the backend cannot start.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let dir = check_dir(log_dir)?;

    let active = ACTIVE.get_or_try_init(|| start_backend(level, &dir))?;
    if active.level != level || active.dir != dir {
        return Err(LoggingError::Conflict {
            active_level: active.level,
            active_dir: active.dir.clone(),
        });
    }
    Ok(())
}

/// `(level, directory)` of the active logger, if any.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE.get().map(|active| (active.level, active.dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_backend(level: &'static str, dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDirectory {
        dir: dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::try_with_str(level)
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEPT_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    PANIC_HOOK.call_once(install_panic_hook);
    info!(
        "event=logging_start module=logging status=ok level={level} os={} version={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<&'static str, LoggingError> {
    let level = level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        _ => Err(LoggingError::UnknownLevel(level)),
    }
}

fn check_dir(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    let raw = log_dir.to_string_lossy();
    if raw.trim().is_empty() || !log_dir.is_absolute() {
        return Err(LoggingError::BadDirectory(raw.into_owned()));
    }
    Ok(log_dir.to_path_buf())
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic module=logging status=error location={location} payload={}",
            panic_summary(info)
        );
        previous(info);
    }));
}

fn panic_summary(info: &PanicHookInfo<'_>) -> String {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<non-string payload>".to_string());
    single_line(&payload, PANIC_SUMMARY_CHARS)
}

/// Flattens `value` to one line of at most `max_chars` characters.
fn single_line(value: &str, max_chars: usize) -> String {
    let flat: String = value
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect();
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
