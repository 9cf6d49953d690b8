//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of the MACD Line series
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9.
//! Fewer than max(fast, slow) + signal - 1 bars: all zero.

use crate::domain::bar::Bar;
use crate::domain::indicator::ema::ema_series;
use crate::domain::indicator::{IndicatorValue, closes};
use rust_decimal::Decimal;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// MACD line aligned on the longer EMA.
pub fn macd_series(values: &[Decimal], fast: usize, slow: usize) -> Vec<Decimal> {
    let fast_ema = ema_series(values, fast);
    let slow_ema = ema_series(values, slow);
    if fast_ema.is_empty() || slow_ema.is_empty() {
        return Vec::new();
    }

    if fast <= slow {
        let offset = slow - fast;
        slow_ema
            .iter()
            .enumerate()
            .map(|(j, s)| fast_ema[j + offset] - s)
            .collect()
    } else {
        let offset = fast - slow;
        fast_ema
            .iter()
            .enumerate()
            .map(|(j, f)| f - slow_ema[j + offset])
            .collect()
    }
}

pub fn calculate_macd(bars: &[Bar], fast: usize, slow: usize, signal: usize) -> IndicatorValue {
    let zero = IndicatorValue::Macd {
        line: Decimal::ZERO,
        signal: Decimal::ZERO,
        histogram: Decimal::ZERO,
    };
    if fast == 0 || slow == 0 || signal == 0 {
        return zero;
    }

    let line = macd_series(&closes(bars), fast, slow);
    let signal_line = ema_series(&line, signal);

    match (line.last(), signal_line.last()) {
        (Some(&line), Some(&signal)) => IndicatorValue::Macd {
            line,
            signal,
            histogram: line - signal,
        },
        _ => zero,
    }
}
