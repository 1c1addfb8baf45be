use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to provision scratch directory at {path}: {source}")]
    Provision { path: PathBuf, source: std::io::Error },

    #[error("failed to spawn sandbox runner {runner}: {source}")]
    Spawn { runner: String, source: std::io::Error },

    #[error("sandbox cleanup sweep failed at {path}: {source}")]
    Cleanup { path: PathBuf, source: std::io::Error },
}

pub type SandboxResult<T> = Result<T, SandboxError>;
