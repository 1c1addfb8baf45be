//! Iteration History: an append-only JSONL journal. Because the
//! Iteration Executor is this journal's sole writer, a single `O_APPEND`
//! write of one self-contained line plus `fsync` gives a no-partial-line
//! guarantee without rewriting the whole file per record.

mod error;

pub use error::{HistoryError, HistoryResult};

use crate::model::IterationRecord;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only, crash-tolerant journal of `IterationRecord`s.
pub struct IterationHistory {
    path: PathBuf,
}

impl IterationHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one record. Serializes to a single line, writes it in one
    /// syscall, then `fsync`s — so a reader never observes a partial line.
    pub fn append(&self, record: &IterationRecord) -> HistoryResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| HistoryError::Io { path: self.path.clone(), source })?;

        file.write_all(line.as_bytes()).map_err(|source| HistoryError::Io { path: self.path.clone(), source })?;
        file.sync_all().map_err(|source| HistoryError::Io { path: self.path.clone(), source })?;
        Ok(())
    }

    /// Load every record, ordered by `iteration_index`. Lines that fail to
    /// parse are skipped with a warning; this is a best-effort log, not a
    /// database.
    pub fn load_all(&self) -> HistoryResult<Vec<IterationRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)
            .map_err(|source| HistoryError::Io { path: self.path.clone(), source })?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (line_number, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!(line_number, error = %e, "failed to read history line");
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<IterationRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line_number, error = %e, "skipping unparseable history line"),
            }
        }

        records.sort_by_key(|r| r.iteration_index);
        Ok(records)
    }

    /// The last `n` records, in iteration order.
    pub fn tail(&self, n: usize) -> HistoryResult<Vec<IterationRecord>> {
        let mut all = self.load_all()?;
        if all.len() > n {
            all.drain(0..all.len() - n);
        }
        Ok(all)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorKind, OutcomeLevel, StrategyMetrics};
    use chrono::Utc;

    fn record(index: u64) -> IterationRecord {
        IterationRecord {
            iteration_index: index,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            artifact_fingerprint: format!("fp-{index}"),
            artifact_text: "def strategy(): pass".into(),
            validation_ok: true,
            metrics: StrategyMetrics::failed(ErrorKind::Timeout),
            outcome_level: OutcomeLevel::Failed,
            champion_update: false,
            preservation_violations: Vec::new(),
            error_kind: None,
            feedback_used_digest: "digest".into(),
        }
    }

    #[test]
    fn append_then_load_round_trips_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let history = IterationHistory::new(tmp.path().join("history.jsonl"));
        for i in 0..5 {
            history.append(&record(i)).unwrap();
        }
        let loaded = history.load_all().unwrap();
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded.iter().map(|r| r.iteration_index).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn tail_returns_last_n_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let history = IterationHistory::new(tmp.path().join("history.jsonl"));
        for i in 0..10 {
            history.append(&record(i)).unwrap();
        }
        let tail = history.tail(3).unwrap();
        assert_eq!(tail.iter().map(|r| r.iteration_index).collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let history = IterationHistory::new(tmp.path().join("nope.jsonl"));
        assert!(history.load_all().unwrap().is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        let history = IterationHistory::new(&path);
        history.append(&record(0)).unwrap();
        let loaded = history.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].iteration_index, 0);
    }
}
