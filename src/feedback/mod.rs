//! Feedback & Prompt Composer: distills the current Champion, the
//! recent history slice, and the failure-pattern table into a structured
//! guidance object for the next proposer call. Composer state is
//! per-iteration, never global: every public function here takes its
//! inputs explicitly and returns a value, with no internal mutable state.

mod error;
pub mod factor_graph;

pub use error::{ComposerError, ComposerResult};
pub use factor_graph::FactorGraph;

use crate::champion_tracker::extract_patterns;
use crate::model::{Champion, Criticality, FailurePattern, ParameterPattern};
use serde::{Deserialize, Serialize};

/// `diversity`/composer-relevant config: `diversity_stride` lives here
/// since it only ever gates the Composer's diversity-forcing directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub diversity_stride: u64,
    pub failure_avoidance_top_m: usize,
    pub max_preservation_retries: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self { diversity_stride: 5, failure_avoidance_top_m: 5, max_preservation_retries: 2 }
    }
}

/// Champion context section of the guidance object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionContext {
    pub fingerprint: String,
    pub sharpe_ratio: Option<f64>,
    pub total_return: Option<f64>,
    pub calmar_ratio: Option<f64>,
    pub patterns: Vec<ParameterPattern>,
}

/// One "keep this parameter within ±X%" instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreservationDirective {
    pub parameter_name: String,
    pub tolerance_fraction: f64,
    pub criticality: Criticality,
}

/// The full structured guidance object handed to the proposer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Guidance {
    pub champion_context: Option<ChampionContext>,
    pub preservation_directives: Vec<PreservationDirective>,
    pub failure_avoidance: Vec<String>,
    pub diversity_forcing: bool,
    pub exploration_mode: bool,
}

/// Inputs the Composer needs for one `compose()` call. Passed explicitly,
/// never read from process-wide state.
pub struct ComposeInput<'a> {
    pub champion: Option<&'a Champion>,
    pub failure_patterns: &'a [FailurePattern],
    pub iteration_index: u64,
    pub diversity_below_threshold: bool,
    pub exploration_mode: bool,
}

/// Build the guidance object for the next proposer call.
pub fn compose(input: ComposeInput<'_>, config: &ComposerConfig) -> Guidance {
    let champion_context = input.champion.map(|champion| ChampionContext {
        fingerprint: champion.fingerprint.clone(),
        sharpe_ratio: champion.metrics.sharpe_ratio,
        total_return: champion.metrics.total_return,
        calmar_ratio: champion.metrics.calmar_ratio,
        patterns: champion.success_patterns.clone(),
    });

    let preservation_directives = input
        .champion
        .map(|champion| {
            champion
                .success_patterns
                .iter()
                .map(|pattern| PreservationDirective {
                    parameter_name: pattern.parameter_name.clone(),
                    tolerance_fraction: pattern.tolerance(),
                    criticality: pattern.criticality,
                })
                .collect()
        })
        .unwrap_or_default();

    let mut failure_avoidance: Vec<&FailurePattern> = input.failure_patterns.iter().collect();
    failure_avoidance.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    let failure_avoidance = failure_avoidance
        .into_iter()
        .take(config.failure_avoidance_top_m)
        .map(|pattern| format!("{}: {} (seen {} times)", pattern.kind, pattern.description, pattern.occurrences))
        .collect();

    let diversity_forcing = input.diversity_below_threshold
        || (config.diversity_stride > 0 && input.iteration_index % config.diversity_stride == 0);

    Guidance {
        champion_context,
        preservation_directives,
        failure_avoidance,
        diversity_forcing,
        exploration_mode: input.exploration_mode,
    }
}

/// Tighten every preservation directive's tolerance for a stricter retry.
pub fn strengthen(mut guidance: Guidance) -> Guidance {
    for directive in &mut guidance.preservation_directives {
        directive.tolerance_fraction *= 0.5;
    }
    guidance
}

/// Re-validate a candidate's extracted parameters against the champion's
/// preservation directives.
///
/// Champion parameters are chained into a `FactorGraph` in the order
/// `extract_patterns` found them (a straight-line proxy for "computed
/// from the ones before it"). A parameter absent from the candidate is
/// treated as a replaced factor: its cascade of transitive dependents is
/// removed from the graph and exempted from this round's preservation
/// check too, rather than independently enforcing tolerances against
/// parameters whose upstream factor no longer exists in the candidate.
///
/// Returns one violation description per breached directive.
pub fn revalidate_preservation(candidate_text: &str, champion: Option<&Champion>) -> Vec<String> {
    let Some(champion) = champion else { return Vec::new() };
    let candidate_patterns = extract_patterns(candidate_text);

    let mut graph = FactorGraph::new();
    for pair in champion.success_patterns.windows(2) {
        graph.add_dependency(&pair[0].parameter_name, &pair[1].parameter_name);
    }
    if let [only] = champion.success_patterns.as_slice() {
        graph.add_factor(&only.parameter_name);
    }

    let mut exempted: std::collections::HashSet<String> = std::collections::HashSet::new();
    for champion_pattern in &champion.success_patterns {
        if exempted.contains(&champion_pattern.parameter_name) {
            continue;
        }
        let still_present = candidate_patterns.iter().any(|p| p.parameter_name == champion_pattern.parameter_name);
        if !still_present {
            for dependent in graph.remove_cascading(&champion_pattern.parameter_name) {
                exempted.insert(dependent);
            }
        }
    }

    champion
        .success_patterns
        .iter()
        .filter(|champion_pattern| !exempted.contains(&champion_pattern.parameter_name))
        .filter_map(|champion_pattern| {
            let candidate_value = candidate_patterns
                .iter()
                .find(|p| p.parameter_name == champion_pattern.parameter_name)?
                .value_at_champion;
            if champion_pattern.preserved(candidate_value) {
                None
            } else {
                Some(format!(
                    "{} drifted to {candidate_value} outside ±{:.0}% of champion value {}",
                    champion_pattern.parameter_name,
                    champion_pattern.tolerance() * 100.0,
                    champion_pattern.value_at_champion
                ))
            }
        })
        .collect()
}

/// Stable digest of the guidance object, stored as `feedback_used_digest`
/// on the `IterationRecord` for replayability.
pub fn digest(guidance: &Guidance) -> ComposerResult<String> {
    let canonical = serde_json::to_vec(guidance)?;
    Ok(blake3::hash(&canonical).to_hex().to_string())
}

/// Tag a failure observation into (or grow) the `FailurePattern` table.
/// FailurePatterns grow monotonically and are never deleted.
pub fn record_failure(
    table: &mut Vec<FailurePattern>,
    kind: crate::model::FailureKind,
    description: impl Into<String>,
    iteration_index: u64,
) {
    let description = description.into();
    if let Some(existing) = table.iter_mut().find(|p| p.kind == kind && p.description == description) {
        existing.occurrences += 1;
        existing.last_iteration = iteration_index;
    } else {
        table.push(FailurePattern { kind, description, occurrences: 1, last_iteration: iteration_index });
    }
}
