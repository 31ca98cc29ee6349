use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub answer: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

/// Query/answer log stored as one JSON array, rewritten on every append.
///
/// There is no locking: two processes appending at the same time can lose
/// each other's entries.
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HistoryLog { path: path.into() }
    }

    /// All entries in insertion order. A missing or unreadable log is empty.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Could not read {:?}, starting with empty history: {e}", self.path);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Corrupt history file {:?}, starting with empty history: {e}", self.path);
                Vec::new()
            }
        }
    }

    pub fn append(&self, query: &str, answer: &str) -> Result<HistoryEntry> {
        let entry = HistoryEntry {
            query: query.to_string(),
            answer: answer.to_string(),
            timestamp: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
        };

        let mut history = self.entries();
        history.push(entry.clone());

        let content = serde_json::to_string_pretty(&history)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write history to {:?}", self.path))?;

        info!("Query and answer saved to {:?}: {entry:?}", self.path);
        Ok(entry)
    }
}
