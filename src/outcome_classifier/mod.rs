//! Outcome Classifier: a pure, total mapping from `StrategyMetrics`
//! to the ordinal `OutcomeLevel`.

use crate::model::{OutcomeLevel, StrategyMetrics};

const COVERAGE_THRESHOLD: f64 = 0.6;

/// Classify a single result.
pub fn classify(metrics: &StrategyMetrics) -> OutcomeLevel {
    if !metrics.execution_success {
        return OutcomeLevel::Failed;
    }
    if metrics.coverage < COVERAGE_THRESHOLD {
        return OutcomeLevel::Executed;
    }
    match metrics.sharpe_ratio {
        Some(sharpe) if sharpe > 0.0 => OutcomeLevel::Profitable,
        _ => OutcomeLevel::ValidMetrics,
    }
}

/// Classify a batch of N results: `PROFITABLE` iff the mean coverage
/// is at least the threshold and the profitable fraction is at least 0.4;
/// otherwise step down through the same table using the weakest satisfied
/// condition. An empty batch is `FAILED`.
pub fn classify_batch(results: &[StrategyMetrics]) -> OutcomeLevel {
    if results.is_empty() {
        return OutcomeLevel::Failed;
    }

    let n = results.len() as f64;
    let coverage_mean = results.iter().map(|m| m.coverage).sum::<f64>() / n;
    let profitable_fraction =
        results.iter().filter(|m| classify(m) == OutcomeLevel::Profitable).count() as f64 / n;

    if coverage_mean >= COVERAGE_THRESHOLD && profitable_fraction >= 0.4 {
        return OutcomeLevel::Profitable;
    }

    let any_executed = results.iter().any(|m| m.execution_success);
    if !any_executed {
        return OutcomeLevel::Failed;
    }
    if coverage_mean >= COVERAGE_THRESHOLD {
        return OutcomeLevel::ValidMetrics;
    }
    OutcomeLevel::Executed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorKind;

    fn metrics(execution_success: bool, coverage: f64, sharpe: Option<f64>) -> StrategyMetrics {
        StrategyMetrics { execution_success, coverage, sharpe_ratio: sharpe, ..Default::default() }
    }

    #[test]
    fn failed_execution_is_failed() {
        assert_eq!(classify(&StrategyMetrics::failed(ErrorKind::Timeout)), OutcomeLevel::Failed);
    }

    #[test]
    fn low_coverage_is_executed() {
        assert_eq!(classify(&metrics(true, 0.33, Some(1.0))), OutcomeLevel::Executed);
    }

    #[test]
    fn coverage_exactly_at_threshold_with_zero_sharpe_is_valid_metrics() {
        assert_eq!(classify(&metrics(true, 0.6, Some(0.0))), OutcomeLevel::ValidMetrics);
    }

    #[test]
    fn coverage_just_below_threshold_with_positive_sharpe_is_executed() {
        assert_eq!(classify(&metrics(true, 0.5999, Some(1.0))), OutcomeLevel::Executed);
    }

    #[test]
    fn sufficient_coverage_and_positive_sharpe_is_profitable() {
        assert_eq!(classify(&metrics(true, 1.0, Some(1.21))), OutcomeLevel::Profitable);
    }

    #[test]
    fn absent_sharpe_with_sufficient_coverage_is_valid_metrics() {
        assert_eq!(classify(&metrics(true, 1.0, None)), OutcomeLevel::ValidMetrics);
    }

    #[test]
    fn empty_batch_is_failed() {
        assert_eq!(classify_batch(&[]), OutcomeLevel::Failed);
    }

    #[test]
    fn batch_promotes_to_profitable_above_fraction_threshold() {
        let results = vec![
            metrics(true, 1.0, Some(1.0)),
            metrics(true, 1.0, Some(1.0)),
            metrics(true, 1.0, Some(-0.1)),
        ];
        assert_eq!(classify_batch(&results), OutcomeLevel::Profitable);
    }

    #[test]
    fn batch_steps_down_when_profitable_fraction_too_low() {
        let results = vec![
            metrics(true, 1.0, Some(1.0)),
            metrics(true, 1.0, Some(-0.1)),
            metrics(true, 1.0, Some(-0.1)),
        ];
        assert_eq!(classify_batch(&results), OutcomeLevel::ValidMetrics);
    }
}
