//! Request journal: a bounded in-memory history of gateway events, appended
//! to a JSONL file and mirrored to `tracing`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_JOURNAL_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            request_id: None,
            message: message.into(),
        }
    }

    pub fn for_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    fn emit_tracing(&self) {
        let request_id = self.request_id.as_deref().unwrap_or("-");
        match self.level {
            LogLevel::Debug => {
                tracing::debug!(component = %self.component, request_id, "{}", self.message)
            }
            LogLevel::Info => {
                tracing::info!(component = %self.component, request_id, "{}", self.message)
            }
            LogLevel::Warn => {
                tracing::warn!(component = %self.component, request_id, "{}", self.message)
            }
            LogLevel::Error => {
                tracing::error!(component = %self.component, request_id, "{}", self.message)
            }
        }
    }
}

struct Journal {
    entries: VecDeque<LogEntry>,
    writer: Option<BufWriter<File>>,
}

impl Journal {
    fn open(file_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut entries = VecDeque::with_capacity(MAX_JOURNAL_ENTRIES);
        if file_path.exists() {
            let reader = BufReader::new(File::open(file_path)?);
            for entry in reader
                .lines()
                .map_while(std::result::Result::ok)
                .filter_map(|line| serde_json::from_str::<LogEntry>(&line).ok())
            {
                push_bounded(&mut entries, entry);
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(file_path)?;

        Ok(Self {
            entries,
            writer: Some(BufWriter::new(file)),
        })
    }

    fn in_memory() -> Self {
        Self {
            entries: VecDeque::new(),
            writer: None,
        }
    }

    fn append(&mut self, entry: LogEntry) {
        if let Some(ref mut writer) = self.writer {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
        push_bounded(&mut self.entries, entry);
    }
}

fn push_bounded(entries: &mut VecDeque<LogEntry>, entry: LogEntry) {
    if entries.len() >= MAX_JOURNAL_ENTRIES {
        entries.pop_front();
    }
    entries.push_back(entry);
}

/// Cloneable handle to the request journal, shared by every request task.
#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Journal>>);

impl SharedLogger {
    /// Open (or create) a journal backed by `file_path`, reloading prior entries.
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Journal::open(file_path.as_ref())?))))
    }

    /// A journal that is never written to disk.
    pub fn in_memory() -> Self {
        Self(Arc::new(Mutex::new(Journal::in_memory())))
    }

    pub fn log(&self, entry: LogEntry) {
        entry.emit_tracing();
        if let Ok(mut journal) = self.0.lock() {
            journal.append(entry);
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    pub fn warn(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, component, message));
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, component, message));
    }

    pub fn debug(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Debug, component, message));
    }

    /// Scope subsequent entries to one inbound request.
    pub fn request(&self, request_id: impl Into<String>) -> RequestLogger {
        RequestLogger {
            inner: self.clone(),
            request_id: request_id.into(),
        }
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.0
            .lock()
            .map(|j| j.entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

/// A [`SharedLogger`] bound to a request id.
#[derive(Clone)]
pub struct RequestLogger {
    inner: SharedLogger,
    request_id: String,
}

impl RequestLogger {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    fn log(&self, level: LogLevel, component: &str, message: impl Into<String>) {
        self.inner
            .log(LogEntry::new(level, component, message).for_request(self.request_id.clone()));
    }

    pub fn info(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Info, component, message);
    }

    pub fn warn(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Warn, component, message);
    }

    pub fn error(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Error, component, message);
    }

    pub fn debug(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Debug, component, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_request_entries_are_tagged() {
        let logger = SharedLogger::in_memory();
        logger.info("startup", "booting");
        logger.request("req-1").warn("proxy", "slow backend");

        let recent = logger.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].request_id.as_deref(), Some("req-1"));
        assert_eq!(recent[0].level, LogLevel::Warn);
        assert_eq!(recent[1].request_id, None);
    }

    #[test]
    fn test_journal_reloads_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("gateway.jsonl");

        {
            let logger = SharedLogger::new(&path).unwrap();
            logger.info("server", "first");
            logger.request("abc").error("stream", "second");
        }

        let reopened = SharedLogger::new(&path).unwrap();
        let recent = reopened.recent(5);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "second");
        assert_eq!(recent[1].message, "first");
    }

    #[test]
    fn test_journal_is_bounded() {
        let logger = SharedLogger::in_memory();
        for i in 0..(MAX_JOURNAL_ENTRIES + 5) {
            logger.debug("test", format!("entry {i}"));
        }
        let all = logger.recent(usize::MAX);
        assert_eq!(all.len(), MAX_JOURNAL_ENTRIES);
        assert_eq!(all[0].message, format!("entry {}", MAX_JOURNAL_ENTRIES + 4));
    }
}
