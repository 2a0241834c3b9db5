//! Logging setup on top of flexi_logger
//!
//! Three line formats are available: `text` (default), `ext` (adds the
//! source location) and `json` (one object per line, for log shippers).

use std::sync::{Mutex, OnceLock};

use colored::Colorize;
use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle};
use strum_macros::{Display, EnumString};

static LOGGER_HANDLE: OnceLock<Mutex<LoggerHandle>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log specification: {0}")]
    Spec(String),

    #[error("Cannot start logger: {0}")]
    Start(String),

    #[error("Logger not initialised")]
    NotInitialised,
}

impl crate::core::error_handling::ContextualError for LoggingError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, LoggingError::Spec(_))
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            LoggingError::Spec(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Ext,
    Json,
}

/// Start the process-wide logger
///
/// `level` takes a flexi_logger spec such as `info` or `scanhub::scan=debug`.
pub fn init_logging(
    level: &str,
    format: LogFormat,
    log_file: Option<&std::path::Path>,
    color: bool,
) -> Result<(), LoggingError> {
    let mut logger = Logger::try_with_str(level).map_err(|e| LoggingError::Spec(e.to_string()))?;

    logger = match (format, color) {
        (LogFormat::Json, _) => logger.format(json_format),
        (LogFormat::Ext, true) => logger.format(ext_color_format),
        (LogFormat::Ext, false) => logger.format(ext_format),
        (LogFormat::Text, true) => logger.format(text_color_format),
        (LogFormat::Text, false) => logger.format(text_format),
    };

    if let Some(path) = log_file {
        let spec = FileSpec::try_from(path).map_err(|e| LoggingError::Spec(e.to_string()))?;
        logger = logger.log_to_file(spec);
    }

    let handle = logger
        .start()
        .map_err(|e| LoggingError::Start(e.to_string()))?;
    let _ = LOGGER_HANDLE.set(Mutex::new(handle));
    Ok(())
}

/// Change the level of a running logger; format and file are fixed at start
pub fn set_log_level(level: &str) -> Result<(), LoggingError> {
    let handle = LOGGER_HANDLE.get().ok_or(LoggingError::NotInitialised)?;
    let mut handle = handle.lock().map_err(|_| LoggingError::NotInitialised)?;
    handle
        .parse_and_push_temp_spec(level)
        .map_err(|e| LoggingError::Spec(e.to_string()))
}

/// Level for a `-v`/`-q` balance
pub fn level_for_verbosity(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    }
}

fn colored_level_tag(level: log::Level) -> colored::ColoredString {
    let tag = level_tag(level);
    match level {
        log::Level::Error => tag.red().bold(),
        log::Level::Warn => tag.yellow(),
        log::Level::Info => tag.green(),
        log::Level::Debug => tag.blue(),
        log::Level::Trace => tag.magenta(),
    }
}

fn timestamp(now: &mut DeferredNow) -> String {
    now.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn text_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {}",
        timestamp(now),
        level_tag(record.level()),
        record.args()
    )
}

fn text_color_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {}",
        timestamp(now).dimmed(),
        colored_level_tag(record.level()),
        record.args()
    )
}

fn ext_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {} ({})",
        timestamp(now),
        level_tag(record.level()),
        record.args(),
        source_location(record.target(), record.line())
    )
}

fn ext_color_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {} ({})",
        timestamp(now).dimmed(),
        colored_level_tag(record.level()),
        record.args(),
        source_location(record.target(), record.line()).dimmed()
    )
}

fn json_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    let line = serde_json::json!({
        "timestamp": now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        "level": level_tag(record.level()),
        "message": record.args().to_string(),
        "target": source_location(record.target(), record.line()),
    });
    match serde_json::to_string(&line) {
        Ok(json) => w.write_all(json.as_bytes()),
        Err(_) => w.write_all(b"{\"error\":\"unserializable log record\"}"),
    }
}

// scanhub::scan::cascade + 42 -> scan/cascade.rs:42
fn source_location(target: &str, line: Option<u32>) -> String {
    let path = match target.strip_prefix("scanhub::") {
        Some(module) => module.replace("::", "/") + ".rs",
        None => target.replace("::", "/"),
    };
    match line {
        Some(line) => format!("{path}:{line}"),
        None => path,
    }
}
