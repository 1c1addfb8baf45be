//! Alert Manager: threshold evaluation over a periodic snapshot of
//! system signals, with per-kind time-window suppression and
//! callback-based delivery to consumers registered at startup.

mod error;
mod journal;

pub use error::{AlertError, AlertResult};
pub use journal::AlertJournal;

use crate::model::{AlertEvent, AlertKind, AlertSeverity};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use tracing::info;

/// `alerts:` config section, one threshold per row of the table.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub high_memory_percent: f64,
    pub diversity_collapse_threshold: f64,
    pub diversity_collapse_ticks: u32,
    pub champion_staleness_iterations: u64,
    pub low_success_rate_threshold: f64,
    pub orphaned_sandbox_count: usize,
    pub suppression_window: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            high_memory_percent: 80.0,
            diversity_collapse_threshold: 0.1,
            diversity_collapse_ticks: 5,
            champion_staleness_iterations: 20,
            low_success_rate_threshold: 0.20,
            orphaned_sandbox_count: 3,
            suppression_window: Duration::minutes(5),
        }
    }
}

/// The system signals the Alert Manager reads on each tick. Any field left
/// `None` skips that row's evaluation for this tick.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub host_memory_percent: Option<f64>,
    pub diversity: Option<f64>,
    pub iterations_since_champion_update: Option<u64>,
    pub success_rate_window: Option<f64>,
    pub live_sandbox_count: Option<usize>,
}

/// Per-kind delivery callback, registered once at startup.
pub type AlertCallback = Box<dyn Fn(&AlertEvent) + Send + Sync>;

pub struct AlertManager {
    config: AlertConfig,
    callback: Option<AlertCallback>,
    last_emitted: HashMap<AlertKind, DateTime<Utc>>,
    suppressed_counts: HashMap<AlertKind, u64>,
    diversity_low_streak: u32,
}

impl AlertManager {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            callback: None,
            last_emitted: HashMap::new(),
            suppressed_counts: HashMap::new(),
            diversity_low_streak: 0,
        }
    }

    pub fn with_callback(mut self, callback: AlertCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// How many times a kind has been suppressed.
    pub fn suppressed_count(&self, kind: AlertKind) -> u64 {
        self.suppressed_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Evaluate every threshold row against `snapshot` at time `now`,
    /// deliver the ones that survive suppression, and return them.
    pub fn tick(&mut self, now: DateTime<Utc>, snapshot: &Snapshot) -> Vec<AlertEvent> {
        let mut candidates = Vec::new();

        if let Some(pct) = snapshot.host_memory_percent {
            if pct > self.config.high_memory_percent {
                candidates.push(self.build(
                    AlertKind::HighMemory,
                    AlertSeverity::Warning,
                    now,
                    json!({ "memory_percent": pct, "threshold": self.config.high_memory_percent }),
                ));
            }
        }

        if let Some(diversity) = snapshot.diversity {
            if diversity < self.config.diversity_collapse_threshold {
                self.diversity_low_streak += 1;
            } else {
                self.diversity_low_streak = 0;
            }
            if self.diversity_low_streak >= self.config.diversity_collapse_ticks {
                candidates.push(self.build(
                    AlertKind::DiversityCollapse,
                    AlertSeverity::Warning,
                    now,
                    json!({ "diversity": diversity, "consecutive_ticks": self.diversity_low_streak }),
                ));
            }
        }

        if let Some(stale) = snapshot.iterations_since_champion_update {
            if stale >= self.config.champion_staleness_iterations {
                candidates.push(self.build(
                    AlertKind::ChampionStaleness,
                    AlertSeverity::Info,
                    now,
                    json!({ "iterations_since_update": stale }),
                ));
            }
        }

        if let Some(rate) = snapshot.success_rate_window {
            if rate < self.config.low_success_rate_threshold {
                candidates.push(self.build(
                    AlertKind::LowSuccessRate,
                    AlertSeverity::Warning,
                    now,
                    json!({ "success_rate": rate, "threshold": self.config.low_success_rate_threshold }),
                ));
            }
        }

        if let Some(count) = snapshot.live_sandbox_count {
            if count > self.config.orphaned_sandbox_count {
                candidates.push(self.build(
                    AlertKind::OrphanedSandboxes,
                    AlertSeverity::Critical,
                    now,
                    json!({ "live_count": count, "threshold": self.config.orphaned_sandbox_count }),
                ));
            }
        }

        self.deliver(candidates, now)
    }

    /// Immediate, non-thresholded alert for a runtime-monitor kill event,
    /// still subject to the same per-kind suppression window.
    pub fn notify_security_kill(&mut self, now: DateTime<Utc>, sandbox_id: &str) -> Vec<AlertEvent> {
        let event = self.build(
            AlertKind::SecurityKilled,
            AlertSeverity::Critical,
            now,
            json!({ "sandbox_id": sandbox_id }),
        );
        self.deliver(vec![event], now)
    }

    fn build(&self, kind: AlertKind, severity: AlertSeverity, now: DateTime<Utc>, context: serde_json::Value) -> AlertEvent {
        let context = match context {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => Default::default(),
        };
        AlertEvent { kind, severity, emitted_at: now, context, suppressed_until: None }
    }

    fn deliver(&mut self, candidates: Vec<AlertEvent>, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let mut delivered = Vec::new();
        for mut event in candidates {
            let suppressed = self
                .last_emitted
                .get(&event.kind)
                .is_some_and(|last| now - *last < self.config.suppression_window);

            if suppressed {
                *self.suppressed_counts.entry(event.kind).or_insert(0) += 1;
                event.suppressed_until = self.last_emitted.get(&event.kind).map(|last| *last + self.config.suppression_window);
                continue;
            }

            self.last_emitted.insert(event.kind, now);
            info!(kind = %event.kind, severity = ?event.severity, "alert emitted");
            if let Some(callback) = &self.callback {
                callback(&event);
            }
            delivered.push(event);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn manager() -> AlertManager {
        AlertManager::new(AlertConfig::default())
    }

    #[test]
    fn high_memory_fires_above_threshold() {
        let mut m = manager();
        let now = Utc::now();
        let events = m.tick(now, &Snapshot { host_memory_percent: Some(85.0), ..Default::default() });
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertKind::HighMemory);
    }

    #[test]
    fn high_memory_stays_silent_below_threshold() {
        let mut m = manager();
        let events = m.tick(Utc::now(), &Snapshot { host_memory_percent: Some(50.0), ..Default::default() });
        assert!(events.is_empty());
    }

    #[test]
    fn diversity_collapse_requires_consecutive_ticks() {
        let mut m = manager();
        let now = Utc::now();
        for _ in 0..4 {
            let events = m.tick(now, &Snapshot { diversity: Some(0.05), ..Default::default() });
            assert!(events.is_empty());
        }
        let events = m.tick(now, &Snapshot { diversity: Some(0.05), ..Default::default() });
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertKind::DiversityCollapse);
    }

    #[test]
    fn diversity_streak_resets_on_recovery() {
        let mut m = manager();
        let now = Utc::now();
        for _ in 0..4 {
            m.tick(now, &Snapshot { diversity: Some(0.05), ..Default::default() });
        }
        m.tick(now, &Snapshot { diversity: Some(0.9), ..Default::default() });
        let events = m.tick(now, &Snapshot { diversity: Some(0.05), ..Default::default() });
        assert!(events.is_empty(), "streak should have reset after the recovery tick");
    }

    #[test]
    fn at_most_one_delivered_per_suppression_window() {
        let mut m = manager();
        let now = Utc::now();
        let first = m.tick(now, &Snapshot { host_memory_percent: Some(90.0), ..Default::default() });
        assert_eq!(first.len(), 1);

        let second = m.tick(now + Duration::seconds(30), &Snapshot { host_memory_percent: Some(90.0), ..Default::default() });
        assert!(second.is_empty());
        assert_eq!(m.suppressed_count(AlertKind::HighMemory), 1);

        let third = m.tick(now + Duration::minutes(6), &Snapshot { host_memory_percent: Some(90.0), ..Default::default() });
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn orphaned_sandboxes_fires_above_count() {
        let mut m = manager();
        let events = m.tick(Utc::now(), &Snapshot { live_sandbox_count: Some(4), ..Default::default() });
        assert_eq!(events[0].kind, AlertKind::OrphanedSandboxes);
        assert_eq!(events[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn security_kill_notification_invokes_callback() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let mut m = manager().with_callback(Box::new(move |_event| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));
        m.notify_security_kill(Utc::now(), "sandbox-1");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn champion_staleness_and_low_success_rate_fire_independently() {
        let mut m = manager();
        let events = m.tick(
            Utc::now(),
            &Snapshot { iterations_since_champion_update: Some(25), success_rate_window: Some(0.1), ..Default::default() },
        );
        assert_eq!(events.len(), 2);
    }
}
