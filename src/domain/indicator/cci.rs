//! CCI (Commodity Channel Index).
//!
//! CCI = (TP - SMA(TP)) / (0.015 × mean deviation), TP = (H + L + C) / 3.
//! Fewer than n bars or zero mean deviation: 0.

use crate::domain::bar::Bar;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_PERIOD: usize = 20;
const LAMBERT_CONSTANT: Decimal = dec!(0.015);

pub fn calculate_cci(bars: &[Bar], period: usize) -> Decimal {
    if period == 0 || bars.len() < period {
        return Decimal::ZERO;
    }

    let n = Decimal::from(period);
    let typical: Vec<Decimal> = bars[bars.len() - period..]
        .iter()
        .map(Bar::typical_price)
        .collect();
    let mean = typical.iter().copied().sum::<Decimal>() / n;
    let mean_deviation = typical.iter().map(|tp| (tp - mean).abs()).sum::<Decimal>() / n;
    if mean_deviation.is_zero() {
        return Decimal::ZERO;
    }

    let current = typical[typical.len() - 1];
    (current - mean) / (LAMBERT_CONSTANT * mean_deviation)
}
