//! Core data model for the iteration engine.
//!
//! These types flow through every component: the proposer produces a
//! `StrategyArtifact`, the sandbox produces `StrategyMetrics`, the outcome
//! classifier derives an `OutcomeLevel`, and the whole of it is folded into
//! an `IterationRecord` that the Champion Tracker and History persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable 256-bit fingerprint of an artifact's normalised text.
pub type Fingerprint = String;

/// Compute the artifact fingerprint: blake3 of the text after
/// whitespace-insensitive normalisation (collapse runs of whitespace to a
/// single space, trim each line).
pub fn fingerprint_text(text: &str) -> Fingerprint {
    let normalized: String = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}

/// An opaque, textual strategy program plus its derived fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyArtifact {
    pub text: String,
    pub fingerprint: Fingerprint,
}

impl StrategyArtifact {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = fingerprint_text(&text);
        Self { text, fingerprint }
    }
}

/// A (category, name) pair identifying a data field, canonically formatted
/// as `category:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldReference {
    pub category: String,
    pub name: String,
}

impl FieldReference {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }

    /// Parse a canonical `category:name` string.
    pub fn parse(canonical: &str) -> Option<Self> {
        let (category, name) = canonical.split_once(':')?;
        if category.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(category, name))
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}

/// Exhaustive taxonomy of iteration/sandbox error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Preservation,
    SandboxUnavailable,
    Timeout,
    SecurityKilled,
    Extraction,
    Proposer,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Preservation => "preservation",
            Self::SandboxUnavailable => "sandbox_unavailable",
            Self::Timeout => "timeout",
            Self::SecurityKilled => "security_killed",
            Self::Extraction => "extraction",
            Self::Proposer => "proposer",
            Self::Config => "config",
        };
        write!(f, "{s}")
    }
}

/// A single strategy's extracted backtest metrics.
///
/// `NaN`/`±inf` are never represented here — the Metrics Extractor collapses
/// them to `None` before constructing this record, so every `Option<f64>`
/// that is `Some` is a finite value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StrategyMetrics {
    pub execution_success: bool,
    pub sharpe_ratio: Option<f64>,
    pub total_return: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub calmar_ratio: Option<f64>,
    pub annual_return: Option<f64>,
    pub win_rate: Option<f64>,
    pub trade_count: Option<u64>,
    pub coverage: f64,
    pub error_kind: Option<ErrorKind>,
}

impl StrategyMetrics {
    /// Build a metrics record, computing `coverage` and `calmar_ratio` from
    /// the three required fields.
    pub fn new(
        execution_success: bool,
        sharpe_ratio: Option<f64>,
        total_return: Option<f64>,
        max_drawdown: Option<f64>,
        annual_return: Option<f64>,
        win_rate: Option<f64>,
        trade_count: Option<u64>,
        error_kind: Option<ErrorKind>,
    ) -> Self {
        let sharpe_ratio = sanitize(sharpe_ratio);
        let total_return = sanitize(total_return);
        let max_drawdown = sanitize(max_drawdown);
        let annual_return = sanitize(annual_return);
        let win_rate = sanitize(win_rate);

        let required = [sharpe_ratio.is_some(), total_return.is_some(), max_drawdown.is_some()];
        let coverage = required.iter().filter(|b| **b).count() as f64 / required.len() as f64;

        let calmar_ratio = match (annual_return, max_drawdown) {
            (Some(ar), Some(dd)) if dd != 0.0 => Some(ar / dd.abs()),
            _ => None,
        };

        Self {
            execution_success,
            sharpe_ratio,
            total_return,
            max_drawdown,
            calmar_ratio,
            annual_return,
            win_rate,
            trade_count,
            coverage,
            error_kind,
        }
    }

    /// A failed run with no extracted metrics.
    pub fn failed(error_kind: ErrorKind) -> Self {
        Self {
            execution_success: false,
            error_kind: Some(error_kind),
            ..Default::default()
        }
    }
}

/// Collapse non-finite values to `None`.
fn sanitize(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// Ordinal iteration quality, increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeLevel {
    Failed,
    Executed,
    ValidMetrics,
    Profitable,
}

impl fmt::Display for OutcomeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Failed => "failed",
            Self::Executed => "executed",
            Self::ValidMetrics => "valid_metrics",
            Self::Profitable => "profitable",
        };
        write!(f, "{s}")
    }
}

/// Criticality tag for an extracted parameter pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Critical,
    Moderate,
}

/// A named parameter and its value as observed at champion establishment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterPattern {
    pub parameter_name: String,
    pub value_at_champion: f64,
    pub criticality: Criticality,
}

impl ParameterPattern {
    /// Tolerance, as a fraction, for this pattern's preservation directive.
    pub fn tolerance(&self) -> f64 {
        match self.criticality {
            Criticality::Critical => 0.05,
            Criticality::Moderate => 0.20,
        }
    }

    /// Whether `candidate_value` stays within this pattern's tolerance band.
    pub fn preserved(&self, candidate_value: f64) -> bool {
        if self.value_at_champion == 0.0 {
            return candidate_value == 0.0;
        }
        let delta = (candidate_value - self.value_at_champion).abs() / self.value_at_champion.abs();
        delta <= self.tolerance()
    }
}

/// Kind of recurring failure pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidField,
    ForbiddenConstruct,
    LookAhead,
    SandboxTimeout,
    SecurityKill,
    ExtractionFailure,
    ProposerFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// An accumulated, monotonically-growing record of a recurring failure mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePattern {
    pub kind: FailureKind,
    pub description: String,
    pub occurrences: u64,
    pub last_iteration: u64,
}

/// Severity of an alert event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// Kind of alert, one per row of the threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighMemory,
    DiversityCollapse,
    ChampionStaleness,
    LowSuccessRate,
    OrphanedSandboxes,
    SecurityKilled,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A structured alert emitted by the Alert Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub emitted_at: DateTime<Utc>,
    pub context: std::collections::BTreeMap<String, serde_json::Value>,
    pub suppressed_until: Option<DateTime<Utc>>,
}

/// One append-only journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration_index: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub artifact_fingerprint: Fingerprint,
    pub artifact_text: String,
    pub validation_ok: bool,
    pub metrics: StrategyMetrics,
    pub outcome_level: OutcomeLevel,
    pub champion_update: bool,
    pub preservation_violations: Vec<String>,
    pub error_kind: Option<ErrorKind>,
    pub feedback_used_digest: String,
}

/// The best strategy observed so far under the promotion policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Champion {
    pub fingerprint: Fingerprint,
    pub artifact_text: String,
    pub metrics: StrategyMetrics,
    pub iteration_index: u64,
    pub established_at: DateTime<Utc>,
    pub success_patterns: Vec<ParameterPattern>,
    pub probation_remaining: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_whitespace_insensitive() {
        let a = fingerprint_text("def f():\n    return 1\n");
        let b = fingerprint_text("def f():\n  return 1");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_on_content_change() {
        let a = fingerprint_text("x = 1");
        let b = fingerprint_text("x = 2");
        assert_ne!(a, b);
    }

    #[test]
    fn coverage_counts_required_metrics() {
        let m = StrategyMetrics::new(true, Some(1.0), None, Some(-0.1), None, None, None, None);
        assert!((m.coverage - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn nan_and_inf_become_absent() {
        let m = StrategyMetrics::new(
            true,
            Some(f64::NAN),
            Some(f64::INFINITY),
            Some(-0.1),
            None,
            None,
            None,
            None,
        );
        assert!(m.sharpe_ratio.is_none());
        assert!(m.total_return.is_none());
        assert!((m.coverage - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn calmar_requires_both_inputs() {
        let m = StrategyMetrics::new(true, Some(1.0), Some(0.2), Some(-0.1), Some(0.22), None, None, None);
        assert_eq!(m.calmar_ratio, Some(2.2));
    }

    #[test]
    fn outcome_level_ordering() {
        assert!(OutcomeLevel::Failed < OutcomeLevel::Executed);
        assert!(OutcomeLevel::Executed < OutcomeLevel::ValidMetrics);
        assert!(OutcomeLevel::ValidMetrics < OutcomeLevel::Profitable);
    }

    #[test]
    fn parameter_pattern_tolerance_bands() {
        let critical = ParameterPattern {
            parameter_name: "fast_ma".into(),
            value_at_champion: 10.0,
            criticality: Criticality::Critical,
        };
        assert!(critical.preserved(10.4));
        assert!(!critical.preserved(10.6));

        let moderate = ParameterPattern {
            parameter_name: "slow_ma".into(),
            value_at_champion: 50.0,
            criticality: Criticality::Moderate,
        };
        assert!(moderate.preserved(59.0));
        assert!(!moderate.preserved(61.0));
    }

    #[test]
    fn field_reference_roundtrip() {
        let r = FieldReference::new("etl", "adj_close");
        assert_eq!(r.to_string(), "etl:adj_close");
        assert_eq!(FieldReference::parse("etl:adj_close"), Some(r));
    }
}
