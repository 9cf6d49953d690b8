//! ADX (Average Directional Index) with Wilder smoothing.
//!
//! +DM = high - prev high when it exceeds prev low - low and is positive,
//! -DM the mirror. TR, +DM and -DM are smoothed with
//! `S = S - S/n + x` after an initial n-period sum.
//! +DI = 100 × S(+DM) / S(TR), -DI likewise,
//! DX = 100 × |+DI - -DI| / (+DI + -DI),
//! ADX = mean of the first n DX values, then Wilder-averaged.
//!
//! Fewer than 2n + 1 bars: all three values are zero.

use crate::domain::bar::Bar;
use crate::domain::indicator::IndicatorValue;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_PERIOD: usize = 14;

struct Directional {
    tr: Decimal,
    plus_dm: Decimal,
    minus_dm: Decimal,
}

fn directional(prev: &Bar, cur: &Bar) -> Directional {
    let up = cur.high - prev.high;
    let down = prev.low - cur.low;
    Directional {
        tr: cur.true_range(prev.close),
        plus_dm: if up > down && up > Decimal::ZERO {
            up
        } else {
            Decimal::ZERO
        },
        minus_dm: if down > up && down > Decimal::ZERO {
            down
        } else {
            Decimal::ZERO
        },
    }
}

fn directional_index(smoothed_dm: Decimal, smoothed_tr: Decimal) -> Decimal {
    if smoothed_tr.is_zero() {
        Decimal::ZERO
    } else {
        dec!(100) * smoothed_dm / smoothed_tr
    }
}

fn dx(plus_di: Decimal, minus_di: Decimal) -> Decimal {
    let sum = plus_di + minus_di;
    if sum.is_zero() {
        Decimal::ZERO
    } else {
        dec!(100) * (plus_di - minus_di).abs() / sum
    }
}

pub fn calculate_adx(bars: &[Bar], period: usize) -> IndicatorValue {
    if period == 0 || bars.len() < 2 * period + 1 {
        return IndicatorValue::Adx {
            adx: Decimal::ZERO,
            plus_di: Decimal::ZERO,
            minus_di: Decimal::ZERO,
        };
    }

    let n = Decimal::from(period);
    let moves: Vec<Directional> = bars
        .windows(2)
        .map(|pair| directional(&pair[0], &pair[1]))
        .collect();

    let (mut s_tr, mut s_plus, mut s_minus) = moves[..period].iter().fold(
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        |(tr, p, m), d| (tr + d.tr, p + d.plus_dm, m + d.minus_dm),
    );

    let mut plus_di = directional_index(s_plus, s_tr);
    let mut minus_di = directional_index(s_minus, s_tr);
    let mut dxs = Vec::with_capacity(moves.len() - period + 1);
    dxs.push(dx(plus_di, minus_di));

    for d in &moves[period..] {
        s_tr = s_tr - s_tr / n + d.tr;
        s_plus = s_plus - s_plus / n + d.plus_dm;
        s_minus = s_minus - s_minus / n + d.minus_dm;
        plus_di = directional_index(s_plus, s_tr);
        minus_di = directional_index(s_minus, s_tr);
        dxs.push(dx(plus_di, minus_di));
    }

    let mut adx = dxs[..period].iter().copied().sum::<Decimal>() / n;
    for &value in &dxs[period..] {
        adx = (adx * (n - Decimal::ONE) + value) / n;
    }

    IndicatorValue::Adx {
        adx,
        plus_di,
        minus_di,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn trending_bars(count: usize, step: Decimal) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let close = dec!(500) + step * Decimal::from(i);
                Bar::new(
                    "RTY",
                    start + Duration::minutes(i as i64),
                    close,
                    close + dec!(1),
                    close - dec!(1),
                    close,
                    100,
                )
            })
            .collect()
    }

    #[test]
    fn steady_uptrend_is_fully_directional() {
        let bars = trending_bars(2 * DEFAULT_PERIOD + 1, dec!(1));
        assert_eq!(
            calculate_adx(&bars, DEFAULT_PERIOD),
            IndicatorValue::Adx {
                adx: dec!(100),
                plus_di: dec!(50),
                minus_di: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn steady_downtrend_favours_minus_di() {
        let bars = trending_bars(40, dec!(-1));
        match calculate_adx(&bars, DEFAULT_PERIOD) {
            IndicatorValue::Adx {
                adx,
                plus_di,
                minus_di,
            } => {
                assert_eq!(plus_di, Decimal::ZERO);
                assert!(minus_di > Decimal::ZERO);
                assert_eq!(adx, dec!(100));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn insufficient_bars_are_zero() {
        let bars = trending_bars(2 * DEFAULT_PERIOD, dec!(1));
        assert_eq!(
            calculate_adx(&bars, DEFAULT_PERIOD),
            IndicatorValue::Adx {
                adx: Decimal::ZERO,
                plus_di: Decimal::ZERO,
                minus_di: Decimal::ZERO,
            }
        );
    }
}
