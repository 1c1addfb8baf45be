//! Proposer external interface: a narrow trait boundary over an opaque
//! text-completion endpoint — an `#[async_trait]` with a typed error,
//! swappable for a deterministic fake in tests.

use crate::feedback::Guidance;
use crate::model::StrategyArtifact;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProposerError {
    #[error("proposer call failed: {0}")]
    CallFailed(String),
    #[error("proposer returned an empty artifact")]
    EmptyResponse,
    #[error("proposer call timed out after {0}s")]
    Timeout(u64),
}

pub type ProposerResult<T> = Result<T, ProposerError>;

/// A hint, in `[0.0, 2.0]`, for how much the proposer should diversify its
/// output — raised under exploration mode and diversity forcing.
#[derive(Debug, Clone, Copy)]
pub struct TemperatureHint(pub f64);

impl Default for TemperatureHint {
    fn default() -> Self {
        Self(0.7)
    }
}

/// A function from (guidance, temperature-hint) to a candidate artifact.
/// The caller is free to retry; errors are always typed.
#[async_trait]
pub trait Proposer: Send + Sync {
    async fn propose(&self, guidance: &Guidance, temperature: TemperatureHint) -> ProposerResult<StrategyArtifact>;
}

/// Deterministic fake proposer for tests and the demo `run` subcommand: it
/// cycles through a fixed pool of candidate artifact texts, never calling
/// out to a real text-completion endpoint.
pub struct MockProposer {
    pool: Vec<String>,
    cursor: AtomicUsize,
}

impl MockProposer {
    pub fn new(pool: Vec<String>) -> Self {
        Self { pool, cursor: AtomicUsize::new(0) }
    }

    /// A minimal built-in pool good enough to exercise validation, the
    /// sandbox contract, and the champion policy end to end.
    pub fn with_default_pool() -> Self {
        Self::new(vec![
            "fast_ma = 10\nslow_ma = 30\n\ndef strategy():\n    price = get(\"price:close_price\")\n    fast = indicator(\"sma\", price, fast_ma)\n    slow = indicator(\"sma\", price, slow_ma)\n    return simulate(fast, slow)\n".to_string(),
            "fast_ma = 12\nslow_ma = 26\n\ndef strategy():\n    price = get(\"price:close_price\")\n    fast = indicator(\"ema\", price, fast_ma)\n    slow = indicator(\"ema\", price, slow_ma)\n    return simulate(fast, slow)\n".to_string(),
        ])
    }
}

#[async_trait]
impl Proposer for MockProposer {
    async fn propose(&self, _guidance: &Guidance, _temperature: TemperatureHint) -> ProposerResult<StrategyArtifact> {
        if self.pool.is_empty() {
            return Err(ProposerError::EmptyResponse);
        }
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst) % self.pool.len();
        Ok(StrategyArtifact::new(self.pool[idx].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Guidance;

    #[tokio::test]
    async fn mock_proposer_cycles_through_pool() {
        let proposer = MockProposer::new(vec!["a = 1\n".to_string(), "b = 2\n".to_string()]);
        let guidance = Guidance::default();
        let first = proposer.propose(&guidance, TemperatureHint::default()).await.unwrap();
        let second = proposer.propose(&guidance, TemperatureHint::default()).await.unwrap();
        let third = proposer.propose(&guidance, TemperatureHint::default()).await.unwrap();
        assert_eq!(first.text, "a = 1\n");
        assert_eq!(second.text, "b = 2\n");
        assert_eq!(third.text, "a = 1\n");
    }

    #[tokio::test]
    async fn empty_pool_is_an_error() {
        let proposer = MockProposer::new(vec![]);
        let result = proposer.propose(&Guidance::default(), TemperatureHint::default()).await;
        assert!(matches!(result, Err(ProposerError::EmptyResponse)));
    }
}
