use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("failed to parse artifact source: tree-sitter returned no tree")]
    ParseFailed,
}

pub type ValidationResult<T> = Result<T, ValidationError>;
