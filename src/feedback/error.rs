use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("failed to digest guidance object: {0}")]
    Digest(#[from] serde_json::Error),
}

pub type ComposerResult<T> = Result<T, ComposerError>;
