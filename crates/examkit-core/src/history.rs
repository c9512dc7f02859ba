//! Session history: an append-only, newest-first log of completed sessions.
//!
//! The log itself ([`SessionHistory`]) is a plain value. Durability comes
//! from a [`HistoryBackend`], which always receives the full list so a reader
//! never observes a partially written history.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grader::GradeReport;
use crate::model::ExamMode;

/// Summary of one completed session.
///
/// Serialized as `{id, timestamp, score, totalQuestions, timeSpent, mode}`
/// with `timestamp` in epoch milliseconds and `timeSpent` in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Number of correct answers.
    pub score: usize,
    pub total_questions: usize,
    /// Seconds spent in the session.
    pub time_spent: u64,
    pub mode: ExamMode,
}

impl SessionResult {
    /// Summarize a graded session.
    pub fn from_report(
        report: &GradeReport,
        mode: ExamMode,
        time_spent: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            score: report.score_raw,
            total_questions: report.total_questions,
            time_spent,
            mode,
        }
    }
}

/// Newest-first log of session results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHistory {
    entries: Vec<SessionResult>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries that are already ordered newest-first.
    pub fn from_entries(entries: Vec<SessionResult>) -> Self {
        Self { entries }
    }

    /// Return the history with `result` added as the newest entry.
    pub fn append(mut self, result: SessionResult) -> Self {
        self.entries.insert(0, result);
        self
    }

    /// All entries, newest first.
    pub fn entries(&self) -> &[SessionResult] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&SessionResult> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Add `result` as the newest entry of `history`.
pub fn append_history(history: SessionHistory, result: SessionResult) -> SessionHistory {
    history.append(result)
}

/// Durable storage for the history list.
///
/// Implementations replace the whole list on every write.
pub trait HistoryBackend {
    /// Load the stored list, newest first. An absent store is empty.
    fn load(&self) -> Result<Vec<SessionResult>>;

    /// Atomically replace the stored list.
    fn replace(&mut self, entries: &[SessionResult]) -> Result<()>;
}

/// History kept in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history.json".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl HistoryBackend for JsonFileBackend {
    fn load(&self) -> Result<Vec<SessionResult>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read history from {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse history JSON: {}", self.path.display()))
    }

    fn replace(&mut self, entries: &[SessionResult]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries).context("failed to serialize history")?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        // Write beside the target and rename over it.
        let staging = self.staging_path();
        std::fs::write(&staging, json)
            .with_context(|| format!("failed to write history to {}", staging.display()))?;
        if let Err(e) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_file(&staging);
            return Err(e).with_context(|| {
                format!("failed to replace history at {}", self.path.display())
            });
        }
        Ok(())
    }
}

/// In-memory backend, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Vec<SessionResult>,
}

impl HistoryBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<SessionResult>> {
        Ok(self.entries.clone())
    }

    fn replace(&mut self, entries: &[SessionResult]) -> Result<()> {
        self.entries = entries.to_vec();
        Ok(())
    }
}

/// A history log bound to its backend.
#[derive(Debug)]
pub struct HistoryStore<B: HistoryBackend> {
    backend: B,
    history: SessionHistory,
}

impl<B: HistoryBackend> HistoryStore<B> {
    /// Load the current history from `backend`.
    pub fn open(backend: B) -> Result<Self> {
        let history = SessionHistory::from_entries(backend.load()?);
        Ok(Self { backend, history })
    }

    /// Append a result and persist the full list.
    ///
    /// The in-memory log only changes once the write succeeded.
    pub fn append(&mut self, result: SessionResult) -> Result<()> {
        let updated = append_history(self.history.clone(), result);
        self.backend.replace(updated.entries())?;
        tracing::info!(entries = updated.len(), "appended session to history");
        self.history = updated;
        Ok(())
    }

    /// Drop every entry.
    pub fn clear(&mut self) -> Result<()> {
        self.backend.replace(&[])?;
        self.history = SessionHistory::new();
        Ok(())
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// All entries, newest first.
    pub fn entries(&self) -> &[SessionResult] {
        self.history.entries()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result(score: usize, millis: i64) -> SessionResult {
        SessionResult {
            id: Uuid::new_v4(),
            timestamp: Utc.timestamp_millis_opt(millis).unwrap(),
            score,
            total_questions: 10,
            time_spent: 300,
            mode: ExamMode::Standard,
        }
    }

    #[test]
    fn append_puts_newest_first() {
        let history = SessionHistory::new()
            .append(result(1, 1_000))
            .append(result(2, 2_000))
            .append(result(3, 3_000));
        let scores: Vec<usize> = history.entries().iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![3, 2, 1]);
        assert_eq!(history.latest().unwrap().score, 3);
    }

    #[test]
    fn serialized_shape() {
        let mut r = result(7, 1_700_000_000_123);
        r.id = Uuid::nil();
        r.mode = ExamMode::Custom;
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["timestamp"], 1_700_000_000_123i64);
        assert_eq!(json["score"], 7);
        assert_eq!(json["totalQuestions"], 10);
        assert_eq!(json["timeSpent"], 300);
        assert_eq!(json["mode"], "Custom");
    }

    #[test]
    fn file_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let mut store = HistoryStore::open(JsonFileBackend::new(&path)).unwrap();
        assert!(store.entries().is_empty());
        store.append(result(4, 1_000)).unwrap();
        store.append(result(9, 2_000)).unwrap();

        let reopened = HistoryStore::open(JsonFileBackend::new(&path)).unwrap();
        assert_eq!(reopened.entries().len(), 2);
        assert_eq!(reopened.entries()[0].score, 9);
        assert_eq!(reopened.entries(), store.entries());

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_rename_removes_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory in the way makes the final rename fail.
        let path = dir.path().join("history.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let mut backend = JsonFileBackend::new(&path);
        let err = backend.replace(&[result(1, 1_000)]).unwrap_err();
        assert!(format!("{err:#}").contains("failed to replace history"));
        assert!(!dir.path().join(".history.json.tmp").exists());
    }

    #[test]
    fn file_backend_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = HistoryStore::open(JsonFileBackend::new(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse history"));
    }

    #[test]
    fn clear_empties_store() {
        let mut store = HistoryStore::open(MemoryBackend::default()).unwrap();
        store.append(result(1, 1_000)).unwrap();
        store.clear().unwrap();
        assert!(store.entries().is_empty());
        assert!(store.backend().load().unwrap().is_empty());
    }
}
