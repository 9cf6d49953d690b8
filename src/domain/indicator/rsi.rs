//! RSI (Relative Strength Index).
//!
//! Simple averages over the last n price changes, no Wilder smoothing:
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! avg_loss == 0: 100. Fewer than n + 1 bars: neutral 50.

use crate::domain::bar::Bar;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_PERIOD: usize = 14;
pub const NEUTRAL: Decimal = dec!(50);

pub fn calculate_rsi(bars: &[Bar], period: usize) -> Decimal {
    if period == 0 || bars.len() < period + 1 {
        return NEUTRAL;
    }

    let window = &bars[bars.len() - period - 1..];
    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    for pair in window.windows(2) {
        let change = pair[1].close - pair[0].close;
        if change > Decimal::ZERO {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let n = Decimal::from(period);
    let avg_gain = gains / n;
    let avg_loss = losses / n;

    if avg_loss.is_zero() {
        return dec!(100);
    }

    let rs = avg_gain / avg_loss;
    dec!(100) - dec!(100) / (Decimal::ONE + rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_bars(closes: impl IntoIterator<Item = Decimal>) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| {
                Bar::new(
                    "TEST",
                    start + Duration::minutes(i as i64),
                    close,
                    close,
                    close,
                    close,
                    1000,
                )
            })
            .collect()
    }

    #[test]
    fn rsi_rising_series_is_100() {
        let bars = make_bars((0..20).map(|i| dec!(100) + Decimal::from(i)));
        assert_eq!(calculate_rsi(&bars, 14), dec!(100));
    }

    #[test]
    fn rsi_falling_series_is_0() {
        let bars = make_bars((0..20).map(|i| dec!(100) - Decimal::from(i)));
        assert_eq!(calculate_rsi(&bars, 14), Decimal::ZERO);
    }

    #[test]
    fn rsi_insufficient_is_neutral() {
        let bars = make_bars((0..14).map(|i| dec!(100) + Decimal::from(i)));
        assert_eq!(calculate_rsi(&bars, 14), NEUTRAL);
        assert_eq!(calculate_rsi(&[], 14), NEUTRAL);
    }

    #[test]
    fn rsi_uses_only_last_period_changes() {
        // An early crash outside the window must not matter.
        let mut closes = vec![dec!(500), dec!(100)];
        closes.extend((1..=3).map(|i| dec!(100) + Decimal::from(i)));
        let bars = make_bars(closes);
        assert_eq!(calculate_rsi(&bars, 3), dec!(100));
    }

    #[test]
    fn rsi_balanced_moves_is_50() {
        let bars = make_bars([dec!(10), dec!(11), dec!(10), dec!(11), dec!(10)]);
        assert_eq!(calculate_rsi(&bars, 4), dec!(50));
    }
}
