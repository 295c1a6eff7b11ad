//! Console capture
//!
//! Bounded buffer of the page's console output. The embedding forwards each
//! `console.*` call here; `browser_console_messages` reads it back.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Oldest entries are dropped past this many.
pub const MAX_MESSAGES: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl ConsoleLevel {
    /// Level for a `console` method name; `log` counts as info.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "debug" => Some(Self::Debug),
            "log" | "info" => Some(Self::Info),
            "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ConsoleCapture {
    entries: Mutex<VecDeque<ConsoleEntry>>,
}

impl ConsoleCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ConsoleEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, level: ConsoleLevel, message: impl Into<String>) {
        let mut entries = self.lock();
        entries.push_back(ConsoleEntry {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        });
        while entries.len() > MAX_MESSAGES {
            entries.pop_front();
        }
    }

    /// Record a call with raw arguments: strings verbatim, everything else
    /// as JSON, joined by spaces.
    pub fn record_args(&self, level: ConsoleLevel, args: &[Value]) {
        let message = args
            .iter()
            .map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        self.record(level, message);
    }

    /// `[LEVEL] message` lines at or above `min`.
    pub fn messages(&self, min: ConsoleLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|entry| entry.level >= min)
            .map(|entry| format!("[{}] {}", entry.level, entry.message))
            .collect()
    }

    pub fn entries(&self) -> Vec<ConsoleEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
