//! Error reporting port.
//!
//! Condition and simulation failures never abort a scan. They are handed to
//! an `ErrorSink` with enough context for an external analyzer to aggregate
//! them, and the affected entry or trade is dropped.

use crate::domain::error::{EvalError, SimulationError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    UnsupportedIndicator,
    UnsupportedOperator,
    MalformedValue,
    MissingData,
    Simulation,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorType::UnsupportedIndicator => "unsupported_indicator",
            ErrorType::UnsupportedOperator => "unsupported_operator",
            ErrorType::MalformedValue => "malformed_value",
            ErrorType::MissingData => "missing_data",
            ErrorType::Simulation => "simulation",
        };
        f.write_str(s)
    }
}

impl From<&EvalError> for ErrorType {
    fn from(err: &EvalError) -> Self {
        match err {
            EvalError::UnknownIndicator(_) => ErrorType::UnsupportedIndicator,
            EvalError::UnknownOperator(_) => ErrorType::UnsupportedOperator,
            EvalError::MalformedValue { .. } | EvalError::Overflow { .. } => {
                ErrorType::MalformedValue
            }
            EvalError::MissingData { .. } | EvalError::EmptyHistory => ErrorType::MissingData,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub error_type: ErrorType,
    pub message: String,
    /// Component that raised the error, e.g. `condition_eval`.
    pub source: &'static str,
    pub strategy_id: String,
    pub failed_expression: Option<String>,
    /// Free-form context such as `symbol` and `timestamp`.
    pub context: BTreeMap<String, String>,
}

impl ErrorReport {
    pub fn from_eval(
        err: &EvalError,
        source: &'static str,
        strategy_id: &str,
        failed_expression: Option<String>,
    ) -> Self {
        ErrorReport {
            error_type: ErrorType::from(err),
            message: err.to_string(),
            source,
            strategy_id: strategy_id.to_string(),
            failed_expression,
            context: BTreeMap::new(),
        }
    }

    pub fn from_simulation(err: &SimulationError, strategy_id: &str) -> Self {
        ErrorReport {
            error_type: ErrorType::Simulation,
            message: err.to_string(),
            source: "simulator",
            strategy_id: strategy_id.to_string(),
            failed_expression: None,
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: &str, value: impl ToString) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }
}

pub trait ErrorSink: Send + Sync {
    fn report(&self, report: ErrorReport);
}

/// Logs every report as a `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, report: ErrorReport) {
        warn!(
            error_type = %report.error_type,
            source = report.source,
            strategy_id = %report.strategy_id,
            expression = report.failed_expression.as_deref().unwrap_or(""),
            context = ?report.context,
            "{}",
            report.message
        );
    }
}

/// Collects reports in memory.
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    reports: Mutex<Vec<ErrorReport>>,
}

impl MemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ErrorReport> {
        match self.reports.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.reports().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for MemoryErrorSink {
    fn report(&self, report: ErrorReport) {
        match self.reports.lock() {
            Ok(mut guard) => guard.push(report),
            Err(poisoned) => poisoned.into_inner().push(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_from_eval_error() {
        assert_eq!(
            ErrorType::from(&EvalError::UnknownIndicator("x".into())),
            ErrorType::UnsupportedIndicator
        );
        assert_eq!(
            ErrorType::from(&EvalError::UnknownOperator("!".into())),
            ErrorType::UnsupportedOperator
        );
        assert_eq!(
            ErrorType::from(&EvalError::EmptyHistory),
            ErrorType::MissingData
        );
        assert_eq!(
            ErrorType::from(&EvalError::Overflow {
                expression: "1 - 2".into()
            }),
            ErrorType::MalformedValue
        );
    }

    #[test]
    fn memory_sink_collects_reports() {
        let sink = MemoryErrorSink::new();
        assert!(sink.is_empty());

        let err = EvalError::UnknownIndicator("supertrend".into());
        sink.report(
            ErrorReport::from_eval(&err, "condition_eval", "s1", Some("supertrend > 1".into()))
                .with_context("symbol", "ES"),
        );

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].strategy_id, "s1");
        assert_eq!(reports[0].error_type, ErrorType::UnsupportedIndicator);
        assert_eq!(reports[0].failed_expression.as_deref(), Some("supertrend > 1"));
        assert_eq!(reports[0].context.get("symbol").map(String::as_str), Some("ES"));
    }

    #[test]
    fn tracing_sink_accepts_reports() {
        let err = SimulationError::InvalidPointMultiplier(rust_decimal::Decimal::ZERO);
        TracingErrorSink.report(ErrorReport::from_simulation(&err, "s2"));
    }
}
