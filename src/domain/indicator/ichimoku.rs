//! Ichimoku Kinko Hyo, current (undisplaced) values.
//!
//! - Tenkan-sen: midpoint of the highest high and lowest low over 9 bars
//! - Kijun-sen: same over 26 bars
//! - Senkou Span A: (tenkan + kijun) / 2
//! - Senkou Span B: midpoint over 52 bars
//!
//! A line whose window is longer than the available history takes the
//! current close.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorValue, high_low, last_close};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_TENKAN: usize = 9;
pub const DEFAULT_KIJUN: usize = 26;
pub const DEFAULT_SENKOU_B: usize = 52;

fn midpoint(bars: &[Bar], period: usize) -> Decimal {
    if period == 0 || bars.len() < period {
        return last_close(bars);
    }
    match high_low(&bars[bars.len() - period..]) {
        Some((highest, lowest)) => (highest + lowest) / dec!(2),
        None => last_close(bars),
    }
}

pub fn calculate_ichimoku(
    bars: &[Bar],
    tenkan: usize,
    kijun: usize,
    senkou_b: usize,
) -> IndicatorValue {
    let tenkan = midpoint(bars, tenkan);
    let kijun = midpoint(bars, kijun);
    IndicatorValue::Ichimoku {
        tenkan,
        kijun,
        senkou_a: (tenkan + kijun) / dec!(2),
        senkou_b: midpoint(bars, senkou_b),
    }
}
