//! Leveled message sink used by operations.
//!
//! The core only needs the [`Logger`] trait. `TracingLogger` forwards to the
//! `tracing` subscriber installed by the binary; `MemoryLogger` keeps
//! messages in memory for inspection.

use std::fmt;
use std::sync::Mutex;

/// Log level accepted by a [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Minimal logging capability.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Forwards messages to `tracing` under the `declcheck` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "declcheck", "{}", message),
            Level::Info => tracing::info!(target: "declcheck", "{}", message),
            Level::Warn => tracing::warn!(target: "declcheck", "{}", message),
            Level::Error => tracing::error!(target: "declcheck", "{}", message),
        }
    }
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Messages logged at exactly `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_levels() {
        let logger = MemoryLogger::new();
        logger.info("walking");
        logger.warn("unreadable file");
        logger.debug("skip vendor");

        assert_eq!(logger.entries().len(), 3);
        assert_eq!(logger.messages_at(Level::Warn), vec!["unreadable file"]);
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error > Level::Warn);
        assert_eq!(Level::Info.to_string(), "info");
    }
}
