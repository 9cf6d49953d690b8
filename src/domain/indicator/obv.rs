//! OBV (On-Balance Volume).
//!
//! Cumulative signed volume from the first bar of the slice:
//! up close adds the bar's volume, down close subtracts it, unchanged adds
//! nothing. The first bar contributes 0.

use crate::domain::bar::Bar;
use rust_decimal::Decimal;
use std::cmp::Ordering;

pub fn calculate_obv(bars: &[Bar]) -> Decimal {
    let obv: i128 = bars
        .windows(2)
        .map(|pair| match pair[1].close.cmp(&pair[0].close) {
            Ordering::Greater => i128::from(pair[1].volume),
            Ordering::Less => -i128::from(pair[1].volume),
            Ordering::Equal => 0,
        })
        .sum();
    Decimal::from_i128_with_scale(obv, 0)
}
