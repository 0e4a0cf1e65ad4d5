//! Console logger with level filtering

use super::traits::Logger;

/// Verbosity threshold for [`ConsoleLogger`].
///
/// Levels are ordered from quietest to loudest, so `level >= LogLevel::Info`
/// asks whether info messages pass the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    Info,
    Debug,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// Logger that writes to stdout/stderr with a level filter.
///
/// Info and debug messages go to stdout, warnings and errors to stderr.
#[derive(Debug, Clone, Default)]
pub struct ConsoleLogger {
    level: LogLevel,
    prefix: Option<String>,
}

impl ConsoleLogger {
    /// Create a console logger at the default `Info` level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the verbosity threshold.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Prepend `[prefix]` to every line, typically a stack name.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    fn format(&self, label: &str, message: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("[{prefix}] [{label}] {message}"),
            None => format!("[{label}] {message}"),
        }
    }
}

impl Logger for ConsoleLogger {
    fn debug(&self, message: &str) {
        if self.level >= LogLevel::Debug {
            println!("{}", self.format("DEBUG", message));
        }
    }

    fn info(&self, message: &str) {
        if self.level >= LogLevel::Info {
            println!("{}", self.format("INFO", message));
        }
    }

    fn warn(&self, message: &str) {
        if self.level >= LogLevel::Warn {
            eprintln!("{}", self.format("WARN", message));
        }
    }

    fn error(&self, message: &str) {
        if self.level >= LogLevel::Error {
            eprintln!("{}", self.format("ERROR", message));
        }
    }
}
