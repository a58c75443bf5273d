use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;
use crate::config::expand_home;

// ---------------------------------------------------------------------------
// Activity log entry (JSONL)
// ---------------------------------------------------------------------------

/// One line of the activity log (`~/.equipviz/activity.jsonl`).
///
/// Every dashboard handler run appends one entry, including soft failures
/// whose status message may be overwritten before the user sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    /// Handler name: `connect`, `upload`, `history`, `report`, `sample`.
    pub action: String,
    pub outcome: Outcome,
    pub message: String,
    /// Wall-clock time spent in network calls, when any were made.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Ok,
    /// Guard failed before any request was sent.
    Skipped,
    /// Failure that only updated the status message.
    SoftFailure,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skipped => write!(f, "skipped"),
            Self::SoftFailure => write!(f, "soft-failure"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Log handle
// ---------------------------------------------------------------------------

/// Append-only JSONL sink. A disabled log drops every record.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        if config.enabled && !config.path.is_empty() {
            Self::at(expand_home(&config.path))
        } else {
            Self::disabled()
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a handler outcome. I/O errors are swallowed: logging must never
    /// turn a dashboard action into a failure.
    pub fn record(&self, action: &str, outcome: Outcome, message: &str, latency_ms: Option<u64>) {
        let Some(path) = &self.path else {
            return;
        };

        let entry = ActivityEntry {
            timestamp: Utc::now().to_rfc3339(),
            action: action.to_string(),
            outcome,
            message: message.to_string(),
            latency_ms,
        };

        let _ = append_entry(path, &entry);
    }

    /// Read every entry, silently skipping malformed lines.
    pub fn read_all(&self) -> Vec<ActivityEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };

        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<ActivityEntry>(&line).ok())
            .collect()
    }

    /// The most recent `limit` entries, oldest first.
    pub fn tail(&self, limit: usize) -> Vec<ActivityEntry> {
        let mut entries = self.read_all();
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
        entries
    }
}

fn append_entry(path: &Path, entry: &ActivityEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::at(dir.path().join("nested").join("activity.jsonl"));

        log.record("connect", Outcome::Ok, "Connected", Some(12));
        log.record("history", Outcome::SoftFailure, "Unable to refresh", None);

        let entries = log.read_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "connect");
        assert_eq!(entries[0].latency_ms, Some(12));
        assert_eq!(entries[1].outcome, Outcome::SoftFailure);
    }

    #[test]
    fn tail_keeps_latest_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::at(dir.path().join("activity.jsonl"));
        for i in 0..5 {
            log.record("history", Outcome::Ok, &format!("run {i}"), None);
        }

        let tail = log.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].message, "run 3");
        assert_eq!(tail[1].message, "run 4");
    }

    #[test]
    fn skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        fs::write(&path, "not json\n").unwrap();
        let log = ActivityLog::at(&path);
        log.record("sample", Outcome::Ok, "ready", None);

        assert_eq!(log.read_all().len(), 1);
    }

    #[test]
    fn disabled_log_is_silent() {
        let log = ActivityLog::disabled();
        log.record("connect", Outcome::Failed, "nope", None);
        assert!(log.read_all().is_empty());
        assert!(log.path().is_none());
    }

    #[test]
    fn outcome_serializes_kebab_case() {
        let json = serde_json::to_string(&Outcome::SoftFailure).unwrap();
        assert_eq!(json, "\"soft-failure\"");
        assert_eq!(Outcome::Skipped.to_string(), "skipped");
    }
}
