//! Champion Tracker: the promotion policy, probation accounting,
//! and the persisted champion artifact. Persistence uses an atomic
//! temp-file+rename pattern; the promotion policy is six ordered rules
//! evaluated against each iteration's record.

mod error;
mod patterns;

pub use error::{ChampionError, ChampionResult};
pub use patterns::extract_patterns;

use crate::history::IterationHistory;
use crate::model::{Champion, IterationRecord, OutcomeLevel};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// `champion:` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChampionConfig {
    pub probation_period: u32,
    pub probation_min_improvement: f64,
    pub post_probation_min_improvement: f64,
    pub min_sharpe: f64,
    pub calmar_retention: f64,
    pub drawdown_tolerance: f64,
}

impl Default for ChampionConfig {
    fn default() -> Self {
        Self {
            probation_period: 2,
            probation_min_improvement: 0.10,
            post_probation_min_improvement: 0.05,
            min_sharpe: 0.5,
            calmar_retention: 0.90,
            drawdown_tolerance: 1.10,
        }
    }
}

/// Result of a single `consider()` call.
#[derive(Debug, Clone)]
pub struct ConsiderOutcome {
    pub updated: bool,
    pub reasons: Vec<String>,
}

/// Holds the current Champion and persists it atomically.
pub struct ChampionTracker {
    path: PathBuf,
    config: ChampionConfig,
    champion: Option<Champion>,
}

impl ChampionTracker {
    /// Load the tracker's state from `path` if it exists, else start empty.
    pub fn load(path: impl Into<PathBuf>, config: ChampionConfig) -> ChampionResult<Self> {
        let path = path.into();
        let champion = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| ChampionError::Io { path: path.clone(), source })?;
            Some(serde_json::from_str(&content).map_err(|source| ChampionError::Parse { path: path.clone(), source })?)
        } else {
            None
        };
        Ok(Self { path, config, champion })
    }

    pub fn current(&self) -> Option<&Champion> {
        self.champion.as_ref()
    }

    /// Evaluate the promotion policy for `record`.
    pub fn consider(&mut self, record: &IterationRecord) -> ChampionResult<ConsiderOutcome> {
        let candidate = &record.metrics;
        let mut reasons = Vec::new();

        // Rule 1: execution gate.
        if !candidate.execution_success || record.outcome_level < OutcomeLevel::ValidMetrics {
            reasons.push("execution gate: not executed successfully to at least VALID_METRICS".to_string());
            return Ok(ConsiderOutcome { updated: false, reasons });
        }

        let candidate_sharpe = candidate.sharpe_ratio.unwrap_or(f64::MIN);

        // Rule 6: minimum floor.
        if candidate_sharpe < self.config.min_sharpe {
            reasons.push(format!("minimum floor: sharpe {candidate_sharpe} < {}", self.config.min_sharpe));
            return Ok(ConsiderOutcome { updated: false, reasons });
        }

        // Rule 5: preservation gate.
        if !record.preservation_violations.is_empty() {
            reasons.push("preservation gate: candidate violates current champion's preservation directives".to_string());
            return Ok(ConsiderOutcome { updated: false, reasons });
        }

        match &self.champion {
            None => {
                if candidate_sharpe <= 0.0 {
                    reasons.push(format!("primary gate: first champion requires sharpe > 0, got {candidate_sharpe}"));
                    return Ok(ConsiderOutcome { updated: false, reasons });
                }
                reasons.push("first champion established".to_string());
                self.promote(record, 0)?;
                Ok(ConsiderOutcome { updated: true, reasons })
            }
            Some(champion) => {
                let min_improvement = if champion.probation_remaining > 0 {
                    self.config.probation_min_improvement
                } else {
                    self.config.post_probation_min_improvement
                };
                let champion_sharpe = champion.metrics.sharpe_ratio.unwrap_or(0.0);
                let required = champion_sharpe * (1.0 + min_improvement);

                if candidate_sharpe < required {
                    let is_probation_only_rejection = champion.probation_remaining > 0;
                    reasons.push(format!(
                        "primary gate: sharpe {candidate_sharpe} < required {required} (min_improvement {min_improvement})"
                    ));
                    if is_probation_only_rejection {
                        info!(
                            candidate_sharpe,
                            required,
                            probation_remaining = champion.probation_remaining,
                            "anti-churn: promotion rejected under probation, probation not reset"
                        );
                    }
                    return Ok(ConsiderOutcome { updated: false, reasons });
                }

                if let (Some(candidate_calmar), Some(champion_calmar)) = (candidate.calmar_ratio, champion.metrics.calmar_ratio) {
                    let required_calmar = champion_calmar * self.config.calmar_retention;
                    if candidate_calmar < required_calmar {
                        reasons.push(format!("calmar retention: {candidate_calmar} < {required_calmar}"));
                        return Ok(ConsiderOutcome { updated: false, reasons });
                    }
                }

                if let (Some(candidate_dd), Some(champion_dd)) = (candidate.max_drawdown, champion.metrics.max_drawdown) {
                    let required_dd = champion_dd * self.config.drawdown_tolerance;
                    if candidate_dd < required_dd {
                        reasons.push(format!("drawdown tolerance: {candidate_dd} < {required_dd}"));
                        return Ok(ConsiderOutcome { updated: false, reasons });
                    }
                }

                let next_probation = champion.probation_remaining.saturating_sub(1);
                reasons.push(format!("promoted: sharpe {candidate_sharpe} >= required {required}"));
                self.promote(record, next_probation)?;
                Ok(ConsiderOutcome { updated: true, reasons })
            }
        }
    }

    fn promote(&mut self, record: &IterationRecord, probation_remaining: u32) -> ChampionResult<()> {
        let success_patterns = extract_patterns(&record.artifact_text);
        let champion = Champion {
            fingerprint: record.artifact_fingerprint.clone(),
            artifact_text: record.artifact_text.clone(),
            metrics: record.metrics.clone(),
            iteration_index: record.iteration_index,
            established_at: Utc::now(),
            success_patterns,
            probation_remaining,
        };
        self.champion = Some(champion);
        self.save()
    }

    /// Atomically replace the champion from a named historical iteration.
    /// Validates the target still passes rules 1 and 6.
    pub fn rollback_to(&mut self, iteration_index: u64, history: &IterationHistory) -> ChampionResult<()> {
        let records = history.load_all().map_err(|_| ChampionError::RollbackTargetNotFound { iteration_index })?;
        let target = records
            .into_iter()
            .find(|r| r.iteration_index == iteration_index)
            .ok_or(ChampionError::RollbackTargetNotFound { iteration_index })?;

        let metrics = &target.metrics;
        let sharpe = metrics.sharpe_ratio.unwrap_or(f64::MIN);
        if !metrics.execution_success || target.outcome_level < OutcomeLevel::ValidMetrics || sharpe < self.config.min_sharpe {
            return Err(ChampionError::RollbackTargetIneligible { iteration_index });
        }

        self.promote(&target, self.config.probation_period)
    }

    /// Atomic write: temp file + rename, mirroring `FeatureRegistry::save`.
    fn save(&self) -> ChampionResult<()> {
        let Some(champion) = &self.champion else { return Ok(()) };
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(champion)?;
        std::fs::write(&temp_path, &content).map_err(|source| ChampionError::Io { path: temp_path.clone(), source })?;
        std::fs::rename(&temp_path, &self.path).map_err(|source| ChampionError::Io { path: self.path.clone(), source })?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
