//! Domain error types.

use chrono::{DateTime, Utc};

/// A parse error with position information for condition parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Failure while resolving or applying a single condition.
///
/// These never escape the public entry check: they are reported to the error
/// sink and the condition evaluates to `false`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unsupported indicator '{0}'")]
    UnknownIndicator(String),

    #[error("unsupported operator '{0}'")]
    UnknownOperator(String),

    #[error("malformed value expression '{expression}': {reason}")]
    MalformedValue { expression: String, reason: String },

    #[error("missing data for {what} at {timestamp}")]
    MissingData {
        what: String,
        timestamp: DateTime<Utc>,
    },

    #[error("empty bar history")]
    EmptyHistory,

    #[error("arithmetic overflow in '{expression}'")]
    Overflow { expression: String },
}

/// Failure while simulating one candidate trade.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("point multiplier must be positive, got {0}")]
    InvalidPointMultiplier(rust_decimal::Decimal),

    #[error("{kind} distance must be positive, got {distance}")]
    InvalidDistance {
        kind: &'static str,
        distance: rust_decimal::Decimal,
    },
}

/// Top-level error type for barscan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("bar data error: {reason}")]
    BarData { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    ConditionParse(#[from] ParseError),

    #[error("invalid strategy: {reason}")]
    StrategyInvalid { reason: String },

    #[error("unknown symbol {symbol}")]
    UnknownSymbol { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&ScanError> for std::process::ExitCode {
    fn from(err: &ScanError) -> Self {
        let code: u8 = match err {
            ScanError::Io(_) => 1,
            ScanError::ConfigParse { .. }
            | ScanError::ConfigMissing { .. }
            | ScanError::ConfigInvalid { .. } => 2,
            ScanError::BarData { .. } => 3,
            ScanError::ConditionParse(_) | ScanError::StrategyInvalid { .. } => 4,
            ScanError::UnknownSymbol { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
