//! Average True Range.
//!
//! TR = max(H - L, |H - prevC|, |L - prevC|); ATR(n) = mean of the last n TRs.
//! Fewer than n + 1 bars: 0.

use crate::domain::bar::Bar;
use rust_decimal::Decimal;

pub const DEFAULT_PERIOD: usize = 14;

/// True ranges for `bars[1..]`, each against the previous close.
pub fn true_ranges(bars: &[Bar]) -> Vec<Decimal> {
    bars.windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect()
}

pub fn calculate_atr(bars: &[Bar], period: usize) -> Decimal {
    if period == 0 || bars.len() < period + 1 {
        return Decimal::ZERO;
    }
    let window = &bars[bars.len() - period - 1..];
    true_ranges(window).into_iter().sum::<Decimal>() / Decimal::from(period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn make_bar(i: i64, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        Bar::new(
            "TEST",
            Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap() + Duration::minutes(i),
            close,
            high,
            low,
            close,
            1000,
        )
    }

    #[test]
    fn atr_flat_series_is_zero() {
        let bars: Vec<Bar> = (0..15)
            .map(|i| make_bar(i, dec!(100), dec!(100), dec!(100)))
            .collect();
        assert_eq!(calculate_atr(&bars, 14), Decimal::ZERO);
    }

    #[test]
    fn atr_simple_average() {
        let bars = vec![
            make_bar(0, dec!(110), dec!(100), dec!(105)),
            make_bar(1, dec!(115), dec!(105), dec!(110)),
            make_bar(2, dec!(120), dec!(110), dec!(115)),
            make_bar(3, dec!(140), dec!(120), dec!(125)),
        ];
        // TRs: 10, 10, 25 → last 2 = (10 + 25) / 2
        assert_eq!(calculate_atr(&bars, 2), dec!(17.5));
        assert_eq!(calculate_atr(&bars, 3), dec!(15));
    }

    #[test]
    fn atr_handles_gaps() {
        let bars = vec![
            make_bar(0, dec!(110), dec!(100), dec!(105)),
            make_bar(1, dec!(130), dec!(120), dec!(125)),
        ];
        // gap up: |130 - 105| = 25
        assert_eq!(calculate_atr(&bars, 1), dec!(25));
    }

    #[test]
    fn atr_insufficient_bars() {
        let bars: Vec<Bar> = (0..14)
            .map(|i| make_bar(i, dec!(110), dec!(90), dec!(100)))
            .collect();
        assert_eq!(calculate_atr(&bars, 14), Decimal::ZERO);
    }
}
