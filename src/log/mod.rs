//! Session event log
//!
//! Every message the interpreter reports (parse failure, invalid pins,
//! clamped delays, lifecycle changes) is kept here for front ends to render,
//! and emitted as a `tracing` event at the matching level.

use std::collections::VecDeque;
use std::fmt;

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A message with its severity and session time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Milliseconds since the session started
    pub elapsed_ms: u64,
}

/// Bounded log; the oldest entries are dropped first
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    dropped: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        EventLog {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>, elapsed_ms: u64) {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!(elapsed_ms, "{message}"),
            LogLevel::Warning => tracing::warn!(elapsed_ms, "{message}"),
            LogLevel::Error => tracing::error!(elapsed_ms, "{message}"),
        }

        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(LogEntry {
            level,
            message,
            elapsed_ms,
        });
    }

    pub fn info(&mut self, message: impl Into<String>, elapsed_ms: u64) {
        self.push(LogLevel::Info, message, elapsed_ms);
    }

    pub fn warning(&mut self, message: impl Into<String>, elapsed_ms: u64) {
        self.push(LogLevel::Warning, message, elapsed_ms);
    }

    pub fn error(&mut self, message: impl Into<String>, elapsed_ms: u64) {
        self.push(LogLevel::Error, message, elapsed_ms);
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries evicted (or refused) since the last clear
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Messages only, oldest first
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_order_and_levels() {
        let mut log = EventLog::new(10);
        log.info("Interpreter paused", 5);
        log.warning("delay(90000) capped to 60000 ms", 6);
        log.error("Sketch parse failed", 7);

        assert_eq!(log.len(), 3);
        assert_eq!(
            log.messages(),
            vec![
                "Interpreter paused",
                "delay(90000) capped to 60000 ms",
                "Sketch parse failed"
            ]
        );
        assert_eq!(log.count(LogLevel::Warning), 1);
        assert_eq!(log.last().map(|e| e.elapsed_ms), Some(7));
    }

    #[test]
    fn test_drops_oldest_when_full() {
        let mut log = EventLog::new(2);
        log.info("a", 0);
        log.info("b", 0);
        log.info("c", 0);
        assert_eq!(log.messages(), vec!["b", "c"]);
        assert_eq!(log.dropped(), 1);

        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.dropped(), 0);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut log = EventLog::new(0);
        log.info("a", 0);
        assert!(log.is_empty());
        assert_eq!(log.dropped(), 1);
    }
}
