use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("proposer call failed: {0}")]
    Proposer(#[from] crate::proposer::ProposerError),
    #[error("static validator could not parse the candidate artifact: {0}")]
    Validation(#[from] crate::validator::ValidationError),
    #[error("champion tracker error: {0}")]
    Champion(#[from] crate::champion_tracker::ChampionError),
    #[error("history journal error: {0}")]
    History(#[from] crate::history::HistoryError),
    #[error("feedback composer error: {0}")]
    Composer(#[from] crate::feedback::ComposerError),
    #[error("failure pattern table error: {0}")]
    FailurePatterns(#[from] crate::failure_patterns::FailurePatternsError),
    #[error("alert journal error: {0}")]
    AlertJournal(#[from] crate::alerts::AlertError),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
