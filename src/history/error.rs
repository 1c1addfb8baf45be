use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to open history journal at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to serialize iteration record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type HistoryResult<T> = Result<T, HistoryError>;
