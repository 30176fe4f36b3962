//! Logging bootstrap and safety policy.
//!
//! # Responsibility
//! - Initialize logging exactly once per process: rotating files when a log
//!   directory is configured, stderr otherwise.
//! - Capture panics as sanitized, metadata-only log events.
//!
//! # Invariants
//! - Initialization is idempotent for the same level and target.
//! - Re-initialization with a different level or target is rejected.
//! - Initialization never panics.

use crate::config::LoggingConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOG_FILE_BASENAME: &str = "contacts";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unsupported log level `{0}`; expected trace|debug|info|warn|error")]
    UnsupportedLevel(String),
    #[error("log directory must be an absolute path, got `{}`", .0.display())]
    RelativeDir(PathBuf),
    #[error("failed to create log directory `{}`: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start logger: {0}")]
    Backend(#[from] FlexiLoggerError),
    #[error("logging already initialized with {active}; refusing to switch to {requested}")]
    Conflict { active: String, requested: String },
}

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Directory(PathBuf),
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stderr => f.write_str("stderr"),
            Self::Directory(dir) => write!(f, "dir={}", dir.display()),
        }
    }
}

struct LoggingState {
    level: &'static str,
    target: LogTarget,
    _logger: LoggerHandle,
}

/// Initializes logging from `config`.
///
/// # Errors
/// - `UnsupportedLevel` for an unknown level name.
/// - `RelativeDir` / `CreateDir` for an unusable log directory.
/// - `Conflict` when logging is already active with other settings.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = normalize_level(&config.level)?;
    let target = match config.dir.as_deref() {
        Some(dir) => LogTarget::Directory(normalize_log_dir(dir)?),
        None => LogTarget::Stderr,
    };

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(level, &target))?;
    ensure_same_settings(state, level, &target)
}

/// Returns the active `(level, target)`, or `None` before initialization.
pub fn logging_status() -> Option<(&'static str, LogTarget)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.target.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, target: &LogTarget) -> Result<LoggingState, LoggingError> {
    let logger = Logger::try_with_str(level)?;
    let logger = match target {
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format),
    }
    .start()?;

    install_panic_hook_once();

    info!(
        "event=app_start module=core status=ok platform={} build_mode={} version={}",
        std::env::consts::OS,
        build_mode(),
        env!("CARGO_PKG_VERSION")
    );
    info!("event=logging_init module=core status=ok level={level} target={target}");

    Ok(LoggingState {
        level,
        target: target.clone(),
        _logger: logger,
    })
}

fn ensure_same_settings(
    state: &LoggingState,
    level: &'static str,
    target: &LogTarget,
) -> Result<(), LoggingError> {
    if state.level != level {
        return Err(LoggingError::Conflict {
            active: format!("level `{}`", state.level),
            requested: format!("level `{level}`"),
        });
    }
    if &state.target != target {
        return Err(LoggingError::Conflict {
            active: format!("target `{}`", state.target),
            requested: format!("target `{target}`"),
        });
    }
    Ok(())
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn normalize_log_dir(dir: &Path) -> Result<PathBuf, LoggingError> {
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDir(dir.to_path_buf()));
    }
    Ok(dir.to_path_buf())
}

fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

// Payloads can carry contact data; keep them on one bounded line.
fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}
