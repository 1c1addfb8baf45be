//! Failure-pattern table persistence: `failure_patterns.json`, atomically
//! rewritten. Mirrors the temp-file+rename discipline
//! `champion_tracker::ChampionTracker::save` uses for `champion.json` —
//! the table is small and rewritten whole on every change rather than
//! appended to.

mod error;

pub use error::{FailurePatternsError, FailurePatternsResult};

use crate::model::FailurePattern;
use std::path::Path;

/// Load the table from `path`, or start empty if it doesn't exist yet.
pub fn load(path: impl AsRef<Path>) -> FailurePatternsResult<Vec<FailurePattern>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|source| FailurePatternsError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content).map_err(|source| FailurePatternsError::Parse { path: path.to_path_buf(), source })
}

/// Atomically rewrite the whole table: write to a sibling `.tmp` file, then
/// rename over `path`.
pub fn save(path: impl AsRef<Path>, table: &[FailurePattern]) -> FailurePatternsResult<()> {
    let path = path.as_ref();
    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(table)?;
    std::fs::write(&temp_path, &content).map_err(|source| FailurePatternsError::Io { path: temp_path.clone(), source })?;
    std::fs::rename(&temp_path, path).map_err(|source| FailurePatternsError::Io { path: path.to_path_buf(), source })?;
    Ok(())
}
