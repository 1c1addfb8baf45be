use serde::{Deserialize, Serialize};

/// The rule a [`Violation`] breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    NoImport,
    NoDynamicEval,
    NoSubprocess,
    NoNetwork,
    NoFilesystem,
    NonPositiveShift,
    UnknownField,
    MissingBacktestReport,
    MultipleBacktestReports,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoImport => "no_import",
            Self::NoDynamicEval => "no_dynamic_eval",
            Self::NoSubprocess => "no_subprocess",
            Self::NoNetwork => "no_network",
            Self::NoFilesystem => "no_filesystem",
            Self::NonPositiveShift => "non_positive_shift",
            Self::UnknownField => "unknown_field",
            Self::MissingBacktestReport => "missing_backtest_report",
            Self::MultipleBacktestReports => "multiple_backtest_reports",
        };
        write!(f, "{s}")
    }
}

/// A single rule violation, ordered by source position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: Rule,
    pub line: usize,
    pub matched_text: String,
    pub suggestion: Option<String>,
}

impl Violation {
    pub fn new(rule: Rule, line: usize, matched_text: impl Into<String>) -> Self {
        Self { rule, line, matched_text: matched_text.into(), suggestion: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Outcome of a single `validate()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub violations: Vec<Violation>,
}
