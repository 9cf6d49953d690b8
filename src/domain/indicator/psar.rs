//! Parabolic SAR (Wilder).
//!
//! The trend starts long when the second close is at or above the first.
//! Each bar: SAR += AF × (EP - SAR), clamped so it never enters the prior two
//! bars' range. Penetration flips the trend, resets SAR to the old EP and AF
//! to the step. A new extreme raises AF by one step up to the maximum.
//! Fewer than 2 bars: current close.

use crate::domain::bar::Bar;
use crate::domain::indicator::last_close;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_STEP: Decimal = dec!(0.02);
pub const DEFAULT_MAX_STEP: Decimal = dec!(0.2);

pub fn calculate_psar(bars: &[Bar], step: Decimal, max_step: Decimal) -> Decimal {
    if bars.len() < 2 {
        return last_close(bars);
    }

    let mut rising = bars[1].close >= bars[0].close;
    let mut sar = if rising { bars[0].low } else { bars[0].high };
    let mut extreme = if rising { bars[0].high } else { bars[0].low };
    let mut af = step;

    for i in 1..bars.len() {
        let bar = &bars[i];
        let prev = &bars[i - 1];
        let before = if i >= 2 { &bars[i - 2] } else { prev };
        let mut next = sar + af * (extreme - sar);

        if rising {
            next = next.min(prev.low).min(before.low);
            if bar.low < next {
                rising = false;
                next = extreme;
                extreme = bar.low;
                af = step;
            } else if bar.high > extreme {
                extreme = bar.high;
                af = (af + step).min(max_step);
            }
        } else {
            next = next.max(prev.high).max(before.high);
            if bar.high > next {
                rising = true;
                next = extreme;
                extreme = bar.high;
                af = step;
            } else if bar.low < extreme {
                extreme = bar.low;
                af = (af + step).min(max_step);
            }
        }
        sar = next;
    }
    sar
}
