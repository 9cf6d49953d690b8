//! Stochastic oscillator.
//!
//! %K = (close - lowest low) / (highest high - lowest low) × 100 over k bars,
//! 50 when the range is zero. %D = SMA(d) of %K (mean of whatever %K values
//! exist when fewer than d). Fewer than k bars: (50, 50).

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorValue, high_low};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;

fn percent_k(window: &[Bar]) -> Decimal {
    let Some((highest, lowest)) = high_low(window) else {
        return dec!(50);
    };
    let range = highest - lowest;
    if range.is_zero() {
        return dec!(50);
    }
    let close = window[window.len() - 1].close;
    (close - lowest) / range * dec!(100)
}

/// %K for every complete window of `k_period` bars.
pub fn percent_k_series(bars: &[Bar], k_period: usize) -> Vec<Decimal> {
    if k_period == 0 || bars.len() < k_period {
        return Vec::new();
    }
    bars.windows(k_period).map(percent_k).collect()
}

pub fn calculate_stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> IndicatorValue {
    let neutral = IndicatorValue::Stochastic {
        k: dec!(50),
        d: dec!(50),
    };
    if k_period == 0 || bars.len() < k_period {
        return neutral;
    }

    let d_period = d_period.max(1);
    let start = bars
        .len()
        .saturating_sub(k_period.saturating_add(d_period) - 1);
    let ks = percent_k_series(&bars[start..], k_period);
    let Some(&k) = ks.last() else {
        return neutral;
    };

    let recent = &ks[ks.len().saturating_sub(d_period)..];
    let d = recent.iter().copied().sum::<Decimal>() / Decimal::from(recent.len());

    IndicatorValue::Stochastic { k, d }
}
