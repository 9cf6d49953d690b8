//! Bollinger Bands.
//!
//! - Middle: SMA over n closes
//! - Upper: Middle + (k × population StdDev)
//! - Lower: Middle - (k × population StdDev)
//!
//! Default parameters: period=20, k=2. Fewer than n bars: all three bands at
//! the current close.

use crate::domain::bar::Bar;
use crate::domain::indicator::stddev::population_stddev;
use crate::domain::indicator::{IndicatorValue, closes, last_close};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: Decimal = dec!(2);

pub fn calculate_bollinger(bars: &[Bar], period: usize, multiplier: Decimal) -> IndicatorValue {
    if period == 0 || bars.len() < period {
        let close = last_close(bars);
        return IndicatorValue::Bollinger {
            upper: close,
            middle: close,
            lower: close,
        };
    }

    let values = closes(&bars[bars.len() - period..]);
    let middle = values.iter().copied().sum::<Decimal>() / Decimal::from(period);
    let width = multiplier * population_stddev(&values);

    IndicatorValue::Bollinger {
        upper: middle + width,
        middle,
        lower: middle - width,
    }
}
