use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub engine: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub engine: Option<String>,
    pub level: Option<LogLevel>,
    pub limit: Option<usize>,
}

impl LogFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        self.engine.as_deref().map_or(true, |engine| entry.engine == engine)
            && self.level.map_or(true, |level| entry.level == level)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    pub total: usize,
    pub by_level: BTreeMap<String, usize>,
    pub by_engine: BTreeMap<String, usize>,
}

/// Bounded, append-only log of engine events. The oldest entry is evicted once
/// `capacity` is reached.
#[derive(Clone, Debug)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
    console_output: Arc<AtomicBool>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
            console_output: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Toggles forwarding of buffered entries to `tracing`.
    pub fn set_console_output(&self, enabled: bool) {
        self.console_output.store(enabled, Ordering::Relaxed);
    }

    pub fn log(&self, level: LogLevel, engine: &str, message: impl Into<String>, metadata: Value) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            engine: engine.to_string(),
            message: message.into(),
            metadata,
        };

        if self.console_output.load(Ordering::Relaxed) {
            forward_to_tracing(&entry);
        }

        self.with_entries(|entries| {
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
        });
    }

    pub fn debug(&self, engine: &str, message: impl Into<String>, metadata: Value) {
        self.log(LogLevel::Debug, engine, message, metadata);
    }

    pub fn info(&self, engine: &str, message: impl Into<String>, metadata: Value) {
        self.log(LogLevel::Info, engine, message, metadata);
    }

    pub fn warn(&self, engine: &str, message: impl Into<String>, metadata: Value) {
        self.log(LogLevel::Warn, engine, message, metadata);
    }

    pub fn error(&self, engine: &str, message: impl Into<String>, metadata: Value) {
        self.log(LogLevel::Error, engine, message, metadata);
    }

    /// Most recent `limit` entries matching `filter`, oldest first.
    pub fn logs(&self, filter: &LogFilter) -> Vec<LogEntry> {
        let mut matching: Vec<LogEntry> = self.with_entries(|entries| {
            entries.iter().filter(|entry| filter.matches(entry)).cloned().collect()
        });

        if let Some(limit) = filter.limit {
            let skip = matching.len().saturating_sub(limit);
            matching.drain(..skip);
        }
        matching
    }

    pub fn stats(&self) -> LogStats {
        self.with_entries(|entries| {
            let mut stats = LogStats { total: entries.len(), ..LogStats::default() };
            for entry in entries.iter() {
                *stats.by_level.entry(entry.level.as_str().to_string()).or_default() += 1;
                *stats.by_engine.entry(entry.engine.clone()).or_default() += 1;
            }
            stats
        })
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.with_entries(|entries| entries.clear());
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut VecDeque<LogEntry>) -> R) -> R {
        match self.entries.lock() {
            Ok(mut entries) => f(&mut entries),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

fn forward_to_tracing(entry: &LogEntry) {
    let event_name = format!("engine.{}.{}", entry.engine.to_ascii_lowercase(), entry.level.as_str());
    let metadata = if entry.metadata.is_null() { String::new() } else { entry.metadata.to_string() };

    match entry.level {
        LogLevel::Debug => tracing::debug!(
            event_name = %event_name,
            engine = %entry.engine,
            metadata = %metadata,
            "{}",
            entry.message
        ),
        LogLevel::Info => tracing::info!(
            event_name = %event_name,
            engine = %entry.engine,
            metadata = %metadata,
            "{}",
            entry.message
        ),
        LogLevel::Warn => tracing::warn!(
            event_name = %event_name,
            engine = %entry.engine,
            metadata = %metadata,
            "{}",
            entry.message
        ),
        LogLevel::Error => tracing::error!(
            event_name = %event_name,
            engine = %entry.engine,
            metadata = %metadata,
            "{}",
            entry.message
        ),
    }
}
