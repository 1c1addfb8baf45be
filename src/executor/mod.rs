//! Iteration Executor: the state machine that composes every other
//! component (`feedback::compose`, `validator::validate`,
//! `sandbox::SandboxExecutor`, `champion_tracker`, `history`, `diversity`,
//! `alerts`) into one full iteration.
//!
//! This is the sole writer of Champion and History for its stream: a
//! `run_iteration` call is not re-entrant against the same `IterationHistory`
//! and `ChampionTracker` instances.

mod error;

pub use error::{ExecutorError, ExecutorResult};

use crate::alerts::{AlertJournal, AlertManager, Snapshot as AlertSnapshot};
use crate::champion_tracker::ChampionTracker;
use crate::diversity::DiversityMonitor;
use crate::failure_patterns;
use crate::feedback::{self, ComposeInput, ComposerConfig};
use crate::field_manifest::FieldManifest;
use crate::history::IterationHistory;
use crate::metrics_extractor;
use crate::model::{ErrorKind, FailureKind, FailurePattern, IterationRecord};
use crate::outcome_classifier;
use crate::proposer::{Proposer, TemperatureHint};
use crate::runtime_monitor::RuntimeMonitor;
use crate::sandbox::SandboxExecutor;
use crate::validator::{self, Rule};
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

/// Maps a validator rule to the recurring-failure-pattern taxonomy.
fn failure_kind_for(rule: Rule) -> FailureKind {
    match rule {
        Rule::UnknownField => FailureKind::InvalidField,
        Rule::NonPositiveShift => FailureKind::LookAhead,
        _ => FailureKind::ForbiddenConstruct,
    }
}

/// Composes the iteration stream's collaborators; owns the sole write
/// access to Champion and History.
pub struct IterationExecutor {
    composer_config: ComposerConfig,
    field_manifest: FieldManifest,
    sandbox: SandboxExecutor,
    champion: ChampionTracker,
    history: IterationHistory,
    diversity: DiversityMonitor,
    alerts: AlertManager,
    alert_journal: AlertJournal,
    failure_patterns: Vec<FailurePattern>,
    failure_patterns_path: PathBuf,
    exploration_remaining: u32,
    exploration_burst: u32,
    max_preservation_retries: u32,
}

impl IterationExecutor {
    /// Loads the failure-pattern table from `failure_patterns_path` if it
    /// exists.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        composer_config: ComposerConfig,
        field_manifest: FieldManifest,
        sandbox: SandboxExecutor,
        champion: ChampionTracker,
        history: IterationHistory,
        diversity: DiversityMonitor,
        alerts: AlertManager,
        exploration_burst: u32,
        failure_patterns_path: PathBuf,
        alerts_log_path: PathBuf,
    ) -> ExecutorResult<Self> {
        let max_preservation_retries = composer_config.max_preservation_retries;
        let failure_patterns = failure_patterns::load(&failure_patterns_path)?;
        Ok(Self {
            composer_config,
            field_manifest,
            sandbox,
            champion,
            history,
            diversity,
            alerts,
            alert_journal: AlertJournal::new(alerts_log_path),
            failure_patterns,
            failure_patterns_path,
            exploration_remaining: 0,
            exploration_burst,
            max_preservation_retries,
        })
    }

    pub fn champion(&self) -> Option<&crate::model::Champion> {
        self.champion.current()
    }

    pub fn history(&self) -> &IterationHistory {
        &self.history
    }

    /// Whether the next `run_iteration` call will run in exploration mode:
    /// a convergence burst raises the proposer's temperature for a fixed
    /// number of iterations.
    pub fn exploration_active(&self) -> bool {
        self.exploration_remaining > 0
    }

    /// Run one full iteration of the state machine.
    pub async fn run_iteration(
        &mut self,
        proposer: &dyn Proposer,
        runtime_monitor: Option<&mut RuntimeMonitor>,
        iteration_index: u64,
    ) -> ExecutorResult<IterationRecord> {
        let started_at = Utc::now();
        let exploration_mode = self.exploration_remaining > 0;
        let diversity_below_threshold = self.diversity.is_below_threshold();

        let mut retries_left = self.max_preservation_retries;
        let mut guidance = feedback::compose(
            ComposeInput {
                champion: self.champion.current(),
                failure_patterns: &self.failure_patterns,
                iteration_index,
                diversity_below_threshold,
                exploration_mode,
            },
            &self.composer_config,
        );
        let feedback_used_digest = feedback::digest(&guidance)?;

        let temperature = if exploration_mode { TemperatureHint(1.3) } else { TemperatureHint::default() };

        let record = loop {
            let artifact = proposer.propose(&guidance, temperature).await?;

            let validation = validator::validate(&artifact.text, &self.field_manifest)?;
            if !validation.ok {
                for violation in &validation.violations {
                    feedback::record_failure(
                        &mut self.failure_patterns,
                        failure_kind_for(violation.rule),
                        format!("{}: {}", violation.rule, violation.matched_text),
                        iteration_index,
                    );
                }
                failure_patterns::save(&self.failure_patterns_path, &self.failure_patterns)?;
                break IterationRecord {
                    iteration_index,
                    started_at,
                    finished_at: Utc::now(),
                    artifact_fingerprint: artifact.fingerprint,
                    artifact_text: artifact.text,
                    validation_ok: false,
                    metrics: crate::model::StrategyMetrics::failed(ErrorKind::Validation),
                    outcome_level: outcome_classifier::classify(&crate::model::StrategyMetrics::failed(ErrorKind::Validation)),
                    champion_update: false,
                    preservation_violations: Vec::new(),
                    error_kind: Some(ErrorKind::Validation),
                    feedback_used_digest,
                };
            }

            let preservation_violations = feedback::revalidate_preservation(&artifact.text, self.champion.current());
            if !preservation_violations.is_empty() && retries_left > 0 {
                retries_left -= 1;
                guidance = feedback::strengthen(guidance);
                continue;
            }

            let execution = self.sandbox.execute(&artifact.text);
            if execution.error_kind == Some(ErrorKind::SandboxUnavailable) {
                break IterationRecord {
                    iteration_index,
                    started_at,
                    finished_at: Utc::now(),
                    artifact_fingerprint: artifact.fingerprint,
                    artifact_text: artifact.text,
                    validation_ok: true,
                    metrics: crate::model::StrategyMetrics::failed(ErrorKind::SandboxUnavailable),
                    outcome_level: outcome_classifier::classify(&crate::model::StrategyMetrics::failed(ErrorKind::SandboxUnavailable)),
                    champion_update: false,
                    preservation_violations,
                    error_kind: Some(ErrorKind::SandboxUnavailable),
                    feedback_used_digest,
                };
            }

            if let Some(monitor) = runtime_monitor {
                let sample = crate::runtime_monitor::Sample {
                    cpu_percent: 0.0,
                    memory_percent: (execution.peak_memory_bytes as f64 / (2.0 * 1024.0 * 1024.0 * 1024.0)) * 100.0,
                    task_count: 1,
                };
                if let Some(event) = monitor.observe(&artifact.fingerprint, sample) {
                    info!(sandbox_id = %event.sandbox_id, reason = ?event.kind, "runtime monitor killed sandbox");
                    feedback::record_failure(
                        &mut self.failure_patterns,
                        FailureKind::SecurityKill,
                        format!("{:?}", event.kind),
                        iteration_index,
                    );
                    failure_patterns::save(&self.failure_patterns_path, &self.failure_patterns)?;
                    let kill_alerts = self.alerts.notify_security_kill(Utc::now(), &event.sandbox_id);
                    self.alert_journal.append_all(&kill_alerts)?;
                }
            }

            let metrics = metrics_extractor::extract(&execution);
            let outcome_level = outcome_classifier::classify(&metrics);

            let mut record = IterationRecord {
                iteration_index,
                started_at,
                finished_at: Utc::now(),
                artifact_fingerprint: artifact.fingerprint,
                artifact_text: artifact.text,
                validation_ok: true,
                metrics,
                outcome_level,
                champion_update: false,
                preservation_violations,
                error_kind: execution.error_kind,
                feedback_used_digest,
            };

            let consider = self.champion.consider(&record)?;
            record.champion_update = consider.updated;
            break record;
        };

        self.history.append(&record)?;

        let converged = self.diversity.update(&record.artifact_fingerprint, record.metrics.sharpe_ratio);
        if converged {
            self.exploration_remaining = self.exploration_burst;
        } else if self.exploration_remaining > 0 {
            self.exploration_remaining -= 1;
        }

        let iterations_since_update = self.champion.current().map(|c| iteration_index.saturating_sub(c.iteration_index));
        let tick_alerts = self.alerts.tick(
            Utc::now(),
            &AlertSnapshot {
                host_memory_percent: None,
                diversity: Some(self.diversity.current_diversity()),
                iterations_since_champion_update: iterations_since_update,
                success_rate_window: None,
                live_sandbox_count: Some(self.sandbox.registry().live_count()),
            },
        );
        self.alert_journal.append_all(&tick_alerts)?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertConfig;
    use crate::champion_tracker::ChampionConfig;
    use crate::diversity::DiversityConfig;
    use crate::field_manifest::FieldMetadata;
    use crate::proposer::MockProposer;
    use crate::sandbox::{SandboxConfig, SandboxRegistry};

    fn manifest() -> FieldManifest {
        FieldManifest::from_fields(
            vec![FieldMetadata { category: "price".into(), name: "close_price".into(), description: String::new() }],
            Default::default(),
        )
        .unwrap()
    }

    fn executor(dir: &std::path::Path) -> IterationExecutor {
        let sandbox_config = SandboxConfig { enabled: false, ..Default::default() };
        IterationExecutor::new(
            ComposerConfig::default(),
            manifest(),
            SandboxExecutor::new(sandbox_config, SandboxRegistry::new()),
            ChampionTracker::load(dir.join("champion.json"), ChampionConfig::default()).unwrap(),
            IterationHistory::new(dir.join("history.jsonl")),
            DiversityMonitor::new(DiversityConfig::default()),
            AlertManager::new(AlertConfig::default()),
            5,
            dir.join("failure_patterns.json"),
            dir.join("alerts.log.jsonl"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn invalid_artifact_records_a_validation_failure_without_touching_champion() {
        let tmp = tempfile::tempdir().unwrap();
        let mut executor = executor(tmp.path());
        let proposer = MockProposer::new(vec!["import os\n".to_string()]);

        let record = executor.run_iteration(&proposer, None, 0).await.unwrap();
        assert!(!record.validation_ok);
        assert_eq!(record.error_kind, Some(ErrorKind::Validation));
        assert!(executor.champion().is_none());
    }

    #[tokio::test]
    async fn disabled_sandbox_yields_sandbox_unavailable_and_is_recorded() {
        let tmp = tempfile::tempdir().unwrap();
        let mut executor = executor(tmp.path());
        let proposer = MockProposer::new(vec![
            "fast_ma = 10\ndef strategy():\n    price = get(\"price:close_price\")\n    return simulate(price)\n".to_string(),
        ]);

        let record = executor.run_iteration(&proposer, None, 0).await.unwrap();
        assert!(record.validation_ok);
        assert_eq!(record.error_kind, Some(ErrorKind::SandboxUnavailable));
        assert!(!record.champion_update);

        let history = executor.history().load_all().unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn validation_failure_persists_the_failure_pattern_table() {
        let tmp = tempfile::tempdir().unwrap();
        let mut executor = executor(tmp.path());
        let proposer = MockProposer::new(vec!["import os\n".to_string()]);

        executor.run_iteration(&proposer, None, 0).await.unwrap();

        let persisted = crate::failure_patterns::load(tmp.path().join("failure_patterns.json")).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].kind, FailureKind::ForbiddenConstruct);
    }
}
