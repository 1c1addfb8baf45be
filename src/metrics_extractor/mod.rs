//! Metrics Extractor: parses a sandbox `ExecutionResult`'s report
//! blob into a typed `StrategyMetrics`. Never raises — any failure becomes
//! `error_kind = EXTRACTION` with `execution_success = false`; tolerant,
//! best-effort parsing of externally produced output.

use crate::model::{ErrorKind, StrategyMetrics};
use crate::sandbox::ExecutionResult;
use serde::Deserialize;

/// Shape of the JSON report blob the sandbox runner writes after calling
/// the backtest simulator interface.
#[derive(Debug, Deserialize, Default)]
struct ReportBlob {
    sharpe_ratio: Option<f64>,
    total_return: Option<f64>,
    max_drawdown: Option<f64>,
    annual_return: Option<f64>,
    win_rate: Option<f64>,
    trade_count: Option<u64>,
}

/// Extract `StrategyMetrics` from an `ExecutionResult`. Tolerates any
/// combination of absent fields; never returns an error.
pub fn extract(result: &ExecutionResult) -> StrategyMetrics {
    if !result.execution_success {
        return StrategyMetrics::failed(result.error_kind.unwrap_or(ErrorKind::Extraction));
    }

    let Some(blob) = result.report_blob.as_ref() else {
        return StrategyMetrics::failed(ErrorKind::Extraction);
    };

    let parsed: ReportBlob = match serde_json::from_slice(blob) {
        Ok(p) => p,
        Err(_) => return StrategyMetrics::failed(ErrorKind::Extraction),
    };

    StrategyMetrics::new(
        true,
        parsed.sharpe_ratio,
        parsed.total_return,
        parsed.max_drawdown,
        parsed.annual_return,
        parsed.win_rate,
        parsed.trade_count,
        None,
    )
}
