//! Diversity / Convergence Monitor: rolling-window diversity
//! measurement and convergence detection over fingerprint and metric
//! stagnation signals.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// `diversity:` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    pub window: usize,
    pub threshold: f64,
    pub convergence_window: u32,
    pub stagnation_window: u32,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self { window: 10, threshold: 0.5, convergence_window: 10, stagnation_window: 20 }
    }
}

/// The monitor's rolling state, updated once per iteration.
pub struct DiversityMonitor {
    config: DiversityConfig,
    fingerprints: VecDeque<String>,
    low_diversity_streak: u32,
    stagnation_streak: u32,
    best_metric: Option<f64>,
}

impl DiversityMonitor {
    pub fn new(config: DiversityConfig) -> Self {
        Self {
            config,
            fingerprints: VecDeque::new(),
            low_diversity_streak: 0,
            stagnation_streak: 0,
            best_metric: None,
        }
    }

    /// Sequence diversity: unique fingerprints in window / window size.
    /// Empty window has diversity 1.0 (vacuously maximally diverse —
    /// nothing has repeated yet).
    pub fn current_diversity(&self) -> f64 {
        if self.fingerprints.is_empty() {
            return 1.0;
        }
        let unique: HashSet<&str> = self.fingerprints.iter().map(String::as_str).collect();
        unique.len() as f64 / self.fingerprints.len() as f64
    }

    /// Push this iteration's fingerprint and best-observed outcome metric
    /// (e.g. sharpe), update the rolling streaks, and report whether
    /// convergence now holds. The very first observation establishes the
    /// baseline but is not itself an improvement, so N consecutive calls
    /// reporting the same metric leave `stagnation_streak == N`.
    pub fn update(&mut self, fingerprint: &str, outcome_metric: Option<f64>) -> bool {
        self.fingerprints.push_back(fingerprint.to_string());
        while self.fingerprints.len() > self.config.window {
            self.fingerprints.pop_front();
        }

        if self.current_diversity() < self.config.threshold {
            self.low_diversity_streak += 1;
        } else {
            self.low_diversity_streak = 0;
        }

        let old_best = self.best_metric;
        let improved = match (outcome_metric, old_best) {
            (Some(candidate), Some(best)) => candidate > best,
            (Some(_), None) => false,
            (None, _) => false,
        };
        if let Some(candidate) = outcome_metric {
            if old_best.map_or(true, |best| candidate > best) {
                self.best_metric = Some(candidate);
            }
        }
        if improved {
            self.stagnation_streak = 0;
        } else {
            self.stagnation_streak += 1;
        }

        self.has_converged()
    }

    /// Whether diversity is currently below the forcing threshold (distinct
    /// from the stricter `convergence_window`/`stagnation_window` check —
    /// used by the Composer to decide `diversity_forcing` per-tick.
    pub fn is_below_threshold(&self) -> bool {
        self.current_diversity() < self.config.threshold
    }

    pub fn has_converged(&self) -> bool {
        self.low_diversity_streak >= self.config.convergence_window
            && self.stagnation_streak >= self.config.stagnation_window
    }
}

/// Population diversity (when a population is in use): mean
/// pairwise dissimilarity over a structural hash of each strategy's factor
/// set. Dissimilarity between two hashes is 1.0 if they differ, 0.0 if
/// identical — a coarse but cheap structural proxy.
pub fn population_diversity(structural_hashes: &[String]) -> f64 {
    let n = structural_hashes.len();
    if n < 2 {
        return 1.0;
    }
    let mut total = 0.0;
    let mut pairs = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += if structural_hashes[i] == structural_hashes[j] { 0.0 } else { 1.0 };
            pairs += 1.0;
        }
    }
    total / pairs
}
