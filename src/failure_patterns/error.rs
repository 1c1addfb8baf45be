use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FailurePatternsError {
    #[error("failed to access failure pattern table {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse failure pattern table {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("failed to serialize failure pattern table: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type FailurePatternsResult<T> = Result<T, FailurePatternsError>;
