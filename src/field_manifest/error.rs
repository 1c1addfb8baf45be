use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldManifestError {
    #[error("failed to read field manifest catalogue at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to parse field manifest catalogue at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("field manifest catalogue contains no fields")]
    Empty,
}

pub type FieldManifestResult<T> = Result<T, FieldManifestError>;
