use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChampionError {
    #[error("failed to read champion file at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to parse champion file at {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("failed to serialize champion: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("rollback target iteration {iteration_index} not found in history")]
    RollbackTargetNotFound { iteration_index: u64 },

    #[error("rollback target iteration {iteration_index} fails the execution or minimum-floor gate")]
    RollbackTargetIneligible { iteration_index: u64 },
}

pub type ChampionResult<T> = Result<T, ChampionError>;
