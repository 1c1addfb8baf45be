//! Alert journal: `alerts.log.jsonl`, one `AlertEvent` per line.
//! Append-only, same single-writer O_APPEND+fsync discipline as
//! `history::IterationHistory` — this is a log, not a queryable store.

use super::error::{AlertError, AlertResult};
use crate::model::AlertEvent;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

pub struct AlertJournal {
    path: PathBuf,
}

impl AlertJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, event: &AlertEvent) -> AlertResult<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| AlertError::Journal { path: self.path.clone(), source })?;
        file.write_all(line.as_bytes()).map_err(|source| AlertError::Journal { path: self.path.clone(), source })?;
        file.sync_all().map_err(|source| AlertError::Journal { path: self.path.clone(), source })?;
        Ok(())
    }

    pub fn append_all(&self, events: &[AlertEvent]) -> AlertResult<()> {
        for event in events {
            self.append(event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertKind, AlertSeverity};
    use chrono::Utc;

    fn event(kind: AlertKind) -> AlertEvent {
        AlertEvent { kind, severity: AlertSeverity::Warning, emitted_at: Utc::now(), context: Default::default(), suppressed_until: None }
    }

    #[test]
    fn append_then_reload_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let journal = AlertJournal::new(tmp.path().join("alerts.log.jsonl"));
        journal.append(&event(AlertKind::HighMemory)).unwrap();
        journal.append(&event(AlertKind::DiversityCollapse)).unwrap();

        let content = std::fs::read_to_string(tmp.path().join("alerts.log.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn append_all_writes_every_event() {
        let tmp = tempfile::tempdir().unwrap();
        let journal = AlertJournal::new(tmp.path().join("alerts.log.jsonl"));
        journal.append_all(&[event(AlertKind::HighMemory), event(AlertKind::OrphanedSandboxes)]).unwrap();
        let content = std::fs::read_to_string(tmp.path().join("alerts.log.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
