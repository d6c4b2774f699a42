//! Endpoint-tagged request log.
//!
//! Every entry goes to `tracing` (the console) and into an in-memory ring buffer.
//! When a log file is configured the entry is also appended to it as JSONL.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 10_000;

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
    /// Route or phase the entry belongs to: `chat`, `translate`, `transcribe`, `startup`.
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            endpoint: endpoint.into(),
            request_id: None,
            message: message.into(),
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    fn emit(&self) {
        let request_id = self.request_id.as_deref().unwrap_or("-");
        match self.level {
            LogLevel::Debug => {
                tracing::debug!(endpoint = %self.endpoint, request_id, "{}", self.message)
            }
            LogLevel::Info => {
                tracing::info!(endpoint = %self.endpoint, request_id, "{}", self.message)
            }
            LogLevel::Warn => {
                tracing::warn!(endpoint = %self.endpoint, request_id, "{}", self.message)
            }
            LogLevel::Error => {
                tracing::error!(endpoint = %self.endpoint, request_id, "{}", self.message)
            }
        }
    }
}

pub struct Logger {
    entries: VecDeque<LogEntry>,
    writer: Option<BufWriter<File>>,
}

impl Logger {
    /// Console and memory only.
    pub fn in_memory() -> Self {
        Self {
            entries: VecDeque::with_capacity(64),
            writer: None,
        }
    }

    /// Also append every entry to `file_path`.
    pub fn with_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref();

        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(Self {
            entries: VecDeque::with_capacity(64),
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn log(&mut self, entry: LogEntry) {
        entry.emit();
        if let Some(ref mut writer) = self.writer {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
        if self.entries.len() >= MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }
}

#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Logger>>);

impl SharedLogger {
    pub fn in_memory() -> Self {
        Self(Arc::new(Mutex::new(Logger::in_memory())))
    }

    pub fn with_file(file_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Logger::with_file(file_path)?))))
    }

    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut logger) = self.0.lock() {
            logger.log(entry);
        }
    }

    pub fn info(&self, endpoint: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, endpoint, message));
    }

    pub fn warn(&self, endpoint: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, endpoint, message));
    }

    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.0.lock().map(|l| l.recent(limit)).unwrap_or_default()
    }

    /// Logger bound to one endpoint and one inbound request.
    pub fn request(&self, endpoint: &'static str) -> RequestLog {
        RequestLog {
            logger: self.clone(),
            endpoint,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Per-request handle so every line of one request carries the same id.
#[derive(Clone)]
pub struct RequestLog {
    logger: SharedLogger,
    endpoint: &'static str,
    request_id: String,
}

impl RequestLog {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.logger.log(
            LogEntry::new(level, self.endpoint, message).with_request_id(self.request_id.clone()),
        );
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }
}
