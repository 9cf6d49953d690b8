//! Williams %R.
//!
//! %R = (highest high - close) / (highest high - lowest low) × -100 over n
//! bars, ranging 0 (close at the high) to -100 (close at the low).
//! Flat range or fewer than n bars: -50.

use crate::domain::bar::Bar;
use crate::domain::indicator::high_low;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_PERIOD: usize = 14;
const NEUTRAL: Decimal = dec!(-50);

pub fn calculate_williams_r(bars: &[Bar], period: usize) -> Decimal {
    if period == 0 || bars.len() < period {
        return NEUTRAL;
    }
    let window = &bars[bars.len() - period..];
    let Some((highest, lowest)) = high_low(window) else {
        return NEUTRAL;
    };
    let range = highest - lowest;
    if range.is_zero() {
        return NEUTRAL;
    }
    let close = window[window.len() - 1].close;
    (highest - close) / range * dec!(-100)
}
