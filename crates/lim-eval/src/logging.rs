//! Log sinks for the `log.*` primitives.

use std::sync::Mutex;

/// `log` target used for records written by documents.
pub const SCRIPT_TARGET: &str = "lim::script";

/// Level of a script log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Prefix written before every record of this level.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Debug => "[debug] ",
            Self::Info => "[info] ",
            Self::Warn => "[warning] ",
            Self::Error => "[error] ",
        }
    }

    /// Field name under the `log` table.
    pub fn name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    fn as_log(self) -> log::Level {
        match self {
            Self::Debug => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

/// Destination of script log records.
pub trait LogSink {
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards records to the process-wide `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl LogSink for LogFacade {
    fn log(&self, level: LogLevel, message: &str) {
        log::log!(target: SCRIPT_TARGET, level.as_log(), "{}{}", level.prefix(), message);
    }
}

/// Keeps prefixed records in memory.
#[derive(Debug, Default)]
pub struct CapturedLog {
    lines: Mutex<Vec<String>>,
}

impl CapturedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records so far, prefix included.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Remove and return the records so far.
    pub fn take(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|mut l| std::mem::take(&mut *l))
            .unwrap_or_default()
    }
}

impl LogSink for CapturedLog {
    fn log(&self, level: LogLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("{}{}", level.prefix(), message));
        }
    }
}
