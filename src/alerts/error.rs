use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert callback panicked: {0}")]
    CallbackPanicked(String),
    #[error("failed to write alert journal {path}: {source}")]
    Journal { path: PathBuf, source: std::io::Error },
    #[error("failed to serialize alert event: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type AlertResult<T> = Result<T, AlertError>;
