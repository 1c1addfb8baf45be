//! Extraction of `ParameterPattern`s from an artifact's source text, used
//! when a candidate is promoted to champion.
//!
//! A best-effort textual scan: simple, regex-driven, and deliberately
//! tolerant of artifacts it cannot fully parse rather than failing the
//! promotion.

use crate::model::{Criticality, ParameterPattern};
use once_cell::sync::Lazy;
use regex::Regex;

static ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*=\s*(-?\d+(?:\.\d+)?)\s*$").unwrap());

/// Names containing any of these substrings are treated as critical
/// (tight ±5% preservation tolerance); everything else extracted is
/// moderate (±20%). This classification is a deliberate implementation
/// choice, recorded in DESIGN.md.
const CRITICAL_NAME_HINTS: &[&str] = &["fast", "threshold", "entry", "exit", "stop"];

pub fn extract_patterns(artifact_text: &str) -> Vec<ParameterPattern> {
    let mut patterns = Vec::new();
    for capture in ASSIGNMENT.captures_iter(artifact_text) {
        let name = capture[1].to_string();
        let Ok(value) = capture[2].parse::<f64>() else { continue };

        let criticality = if CRITICAL_NAME_HINTS.iter().any(|hint| name.contains(hint)) {
            Criticality::Critical
        } else {
            Criticality::Moderate
        };

        patterns.push(ParameterPattern { parameter_name: name, value_at_champion: value, criticality });
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_assignments() {
        let text = "fast_ma = 10\nslow_ma = 50\ndef strategy():\n    pass\n";
        let patterns = extract_patterns(text);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].parameter_name, "fast_ma");
        assert_eq!(patterns[0].criticality, Criticality::Critical);
        assert_eq!(patterns[1].criticality, Criticality::Moderate);
    }

    #[test]
    fn ignores_non_assignment_lines() {
        let text = "def strategy():\n    px = get(\"etl:adj_close\")\n    return simulate(px, 0.0, 0.0, 0, 1)\n";
        assert!(extract_patterns(text).is_empty());
    }
}
