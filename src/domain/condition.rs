//! Entry conditions.
//!
//! A strategy carries raw `Condition` triples exactly as the user wrote them.
//! Before a scan they are compiled once into `CompiledCondition`:
//! - `Operand`: what the left-hand side (and indicator right-hand sides) read
//! - `IndicatorRef`: an indicator with parameters and the output field used
//! - `Comparison`: the operator
//! - `ValueExpr`: the right-hand side

use crate::domain::indicator::IndicatorType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub indicator: String,
    pub operator: String,
    pub value: String,
}

impl Condition {
    pub fn new(
        indicator: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Condition {
            indicator: indicator.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.indicator, self.operator, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Close of the bar (`price` and `close`).
    Price,
    Open,
    High,
    Low,
    Volume,
    /// Bar VWAP, else the session VWAP of the bar's UTC day.
    Vwap,
    /// Pre-computed EMA column (9, 20 or 50), else computed from history.
    Ema(usize),
    /// Pre-computed 20-bar average volume, else computed from history.
    AvgVolume20,
    /// Minutes since UTC midnight.
    Time,
    PrevDayHigh,
    PrevDayLow,
    Indicator(IndicatorRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRef {
    pub indicator_type: IndicatorType,
    pub field: IndicatorField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    StochasticK,
    StochasticD,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
    Adx,
    PlusDi,
    MinusDi,
    Tenkan,
    Kijun,
    SenkouA,
    SenkouB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    /// `|left - right| < 0.01`
    Equal,
    CrossesAbove,
    CrossesBelow,
}

impl Comparison {
    pub fn is_crossover(self) -> bool {
        matches!(self, Comparison::CrossesAbove | Comparison::CrossesBelow)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "=",
            Comparison::CrossesAbove => "crosses_above",
            Comparison::CrossesBelow => "crosses_below",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    Literal(Decimal),
    /// `1.5x_avgVolume20`, `1.01x_vwap`
    Multiple { factor: Decimal, base: Operand },
    /// `9:30` as minutes since midnight.
    ClockTime(u32),
    Operand(Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    pub left: Operand,
    pub comparison: Comparison,
    pub right: ValueExpr,
    pub source: Condition,
}
