//! Run log for the ETL pipeline.
//!
//! Every entry is printed to stderr as it happens and kept in a global
//! collector so the run report can carry the full log. Entries are kept per
//! thread: a run drains only what its own thread logged, so runs on separate
//! threads never see each other's entries.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
    /// Optional indentation level (for nested logs)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            indent: 0,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Global log collector
pub static LOG_COLLECTOR: Lazy<LogCollector> = Lazy::new(LogCollector::new);

/// Prints log entries and keeps them for the run report
pub struct LogCollector {
    entries: Mutex<HashMap<ThreadId, Vec<LogEntry>>>,
}

impl LogCollector {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Print and record a log entry
    pub fn log(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(entry.indent as usize);
        eprintln!(
            "{} {}{} {}",
            entry.timestamp.format("%H:%M:%S"),
            indent,
            prefix,
            entry.message
        );

        // A poisoned lock only means another thread panicked mid-push
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(thread::current().id()).or_default().push(entry);
    }

    /// Take every entry the calling thread recorded
    pub fn drain(&self) -> Vec<LogEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&thread::current().id()).unwrap_or_default()
    }
}

impl Default for LogCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    LOG_COLLECTOR.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_COLLECTOR.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_COLLECTOR.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_COLLECTOR.log(LogEntry::error(msg));
}

pub fn log_warning_indent(msg: impl Into<String>, indent: u8) {
    LOG_COLLECTOR.log(LogEntry::warning(msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_collector_records_and_drains() {
        let collector = LogCollector::new();
        collector.log(LogEntry::info("reading"));
        collector.log(LogEntry::warning("zero denominator").with_indent(1));
        collector.log(LogEntry::warning("unlabeled column"));

        let drained = collector.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[1].level, LogLevel::Warning);
        assert_eq!(drained[1].indent, 1);
        assert!(collector.drain().is_empty());
    }

    #[test]
    fn test_drain_sees_only_own_thread() {
        let collector = LogCollector::new();
        collector.log(LogEntry::info("main run"));

        thread::scope(|s| {
            s.spawn(|| {
                collector.log(LogEntry::error("other run"));
                let other = collector.drain();
                assert_eq!(other.len(), 1);
                assert_eq!(other[0].message, "other run");
            });
        });

        let own = collector.drain();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].message, "main run");
    }

    #[test]
    fn test_entry_serializes_lowercase_level() {
        let json = serde_json::to_value(LogEntry::success("done")).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "done");
        assert!(json.get("timestamp").is_some());
    }
}
