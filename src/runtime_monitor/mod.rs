//! Runtime Monitor: a background sampler that inspects every live
//! sandbox on a fixed interval and kills any that violate runtime policy.
//! A unit struct with a single pure `evaluate` method over a small rolling
//! window of resource-usage samples.

use crate::model::ErrorKind;
use crate::sandbox::SandboxRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{info, warn};

/// A single CPU%/memory%/task-count observation for one sandbox.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub task_count: u32,
}

/// Policy thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeMonitorConfig {
    pub check_interval_s: u64,
    pub cpu_thresh: f64,
    pub cpu_count: usize,
    pub memory_thresh: f64,
    pub memory_count: usize,
    pub combined_cpu: f64,
    pub combined_mem: f64,
    pub pid_limit: u32,
    pub window_size: usize,
}

impl Default for RuntimeMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_s: 5,
            cpu_thresh: 95.0,
            cpu_count: 3,
            memory_thresh: 95.0,
            memory_count: 2,
            combined_cpu: 80.0,
            combined_mem: 80.0,
            pid_limit: 90,
            window_size: 8,
        }
    }
}

/// Why a sandbox was killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillReason {
    CpuSpike,
    MemorySpike,
    CombinedAnomaly,
    TaskBomb,
}

/// `{ kind, triggering_metrics, timestamp, sandbox_id }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub kind: KillReason,
    pub sandbox_id: String,
    pub triggering_cpu_percent: f64,
    pub triggering_memory_percent: f64,
    pub triggering_task_count: u32,
    pub timestamp: DateTime<Utc>,
}

/// Per-sandbox rolling window of samples.
#[derive(Default)]
struct Window {
    samples: VecDeque<Sample>,
}

impl Window {
    fn push(&mut self, sample: Sample, capacity: usize) {
        self.samples.push_back(sample);
        while self.samples.len() > capacity {
            self.samples.pop_front();
        }
    }

    fn last_n_satisfy(&self, n: usize, predicate: impl Fn(&Sample) -> bool) -> bool {
        if self.samples.len() < n {
            return false;
        }
        self.samples.iter().rev().take(n).all(predicate)
    }
}

/// Tracks rolling windows for every sandbox under watch and evaluates the
/// four kill policies on each tick.
pub struct RuntimeMonitor {
    config: RuntimeMonitorConfig,
    windows: HashMap<String, Window>,
    registry: SandboxRegistry,
}

impl RuntimeMonitor {
    pub fn new(config: RuntimeMonitorConfig, registry: SandboxRegistry) -> Self {
        Self { config, windows: HashMap::new(), registry }
    }

    /// Record one sample for `sandbox_id` and evaluate the kill policies.
    /// Returns `Some(SecurityEvent)` and issues the kill when a policy
    /// fires; the sandbox is then dropped from the watch set.
    pub fn observe(&mut self, sandbox_id: &str, sample: Sample) -> Option<SecurityEvent> {
        let window = self.windows.entry(sandbox_id.to_string()).or_default();
        window.push(sample, self.config.window_size);

        let reason = self.evaluate(window, sample);
        if let Some(reason) = reason {
            let event = SecurityEvent {
                kind: reason,
                sandbox_id: sandbox_id.to_string(),
                triggering_cpu_percent: sample.cpu_percent,
                triggering_memory_percent: sample.memory_percent,
                triggering_task_count: sample.task_count,
                timestamp: Utc::now(),
            };
            warn!(sandbox_id, kind = %format!("{reason:?}"), "runtime monitor killing sandbox");
            self.kill(sandbox_id);
            self.windows.remove(sandbox_id);
            return Some(event);
        }
        None
    }

    fn evaluate(&self, window: &Window, latest: Sample) -> Option<KillReason> {
        if latest.task_count as u32 > self.config.pid_limit {
            return Some(KillReason::TaskBomb);
        }
        if window.last_n_satisfy(self.config.cpu_count, |s| s.cpu_percent > self.config.cpu_thresh) {
            return Some(KillReason::CpuSpike);
        }
        if window.last_n_satisfy(self.config.memory_count, |s| s.memory_percent > self.config.memory_thresh) {
            return Some(KillReason::MemorySpike);
        }
        if latest.cpu_percent > self.config.combined_cpu && latest.memory_percent > self.config.combined_mem {
            return Some(KillReason::CombinedAnomaly);
        }
        None
    }

    fn kill(&self, sandbox_id: &str) {
        if let Some(handle) = self.registry.remove(sandbox_id) {
            if let Some(pid) = handle.pid {
                #[cfg(unix)]
                unsafe {
                    libc::kill(pid as i32, libc::SIGKILL);
                }
            }
            info!(sandbox_id, "removed killed sandbox from registry");
        }
    }
}
