//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n values, then
//! EMA[i] = (x[i] - EMA[i-1]) * k + EMA[i-1].
//! Fewer than n bars: current close.

use crate::domain::bar::Bar;
use crate::domain::indicator::{closes, last_close};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Full EMA series; element 0 corresponds to `values[period - 1]`.
pub fn ema_series(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = dec!(2) / Decimal::from(period + 1);
    let seed = values[..period].iter().copied().sum::<Decimal>() / Decimal::from(period);

    let mut series = Vec::with_capacity(values.len() - period + 1);
    series.push(seed);

    let mut ema = seed;
    for &x in &values[period..] {
        ema = (x - ema) * k + ema;
        series.push(ema);
    }
    series
}

pub fn calculate_ema(bars: &[Bar], period: usize) -> Decimal {
    ema_series(&closes(bars), period)
        .last()
        .copied()
        .unwrap_or_else(|| last_close(bars))
}
