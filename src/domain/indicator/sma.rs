//! Simple Moving Average.
//!
//! SMA(n) = mean of the last n closes. Fewer than n bars: current close.

use crate::domain::bar::Bar;
use crate::domain::indicator::{closes, last_close};
use rust_decimal::Decimal;

/// Mean of the last `period` values, `None` when there are fewer.
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().copied().sum::<Decimal>() / Decimal::from(period))
}

/// Rolling mean aligned so that element `j` covers `values[j..j + period]`.
pub fn sma_series(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().copied().sum::<Decimal>() / Decimal::from(period))
        .collect()
}

pub fn calculate_sma(bars: &[Bar], period: usize) -> Decimal {
    sma(&closes(bars), period).unwrap_or_else(|| last_close(bars))
}
