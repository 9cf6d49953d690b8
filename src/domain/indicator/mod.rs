//! Technical indicator implementations.
//!
//! Every indicator is a pure function of an ascending bar slice whose last
//! element is the evaluation point. Insufficient history never fails: each
//! indicator documents the degraded value it returns instead.
//!
//! - `IndicatorType`: indicator identity + parameters (hashable)
//! - `IndicatorValue`: the shapes an indicator output can take
//! - [`compute`]: dispatch from an `IndicatorType` to its current value

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod ichimoku;
pub mod macd;
pub mod obv;
pub mod psar;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod williams_r;

use crate::domain::bar::Bar;
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(Decimal),
    Macd {
        line: Decimal,
        signal: Decimal,
        histogram: Decimal,
    },
    Stochastic {
        k: Decimal,
        d: Decimal,
    },
    Bollinger {
        upper: Decimal,
        middle: Decimal,
        lower: Decimal,
    },
    Adx {
        adx: Decimal,
        plus_di: Decimal,
        minus_di: Decimal,
    },
    Ichimoku {
        tenkan: Decimal,
        kijun: Decimal,
        senkou_a: Decimal,
        senkou_b: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Bollinger {
        period: usize,
        multiplier: Decimal,
    },
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Adx(usize),
    Cci(usize),
    WilliamsR(usize),
    Obv,
    Ichimoku {
        tenkan: usize,
        kijun: usize,
        senkou_b: usize,
    },
    ParabolicSar {
        step: Decimal,
        max_step: Decimal,
    },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Bollinger { period, multiplier } => {
                write!(f, "BOLLINGER({},{})", period, multiplier.normalize())
            }
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
            IndicatorType::WilliamsR(period) => write!(f, "WILLIAMS_R({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Ichimoku {
                tenkan,
                kijun,
                senkou_b,
            } => write!(f, "ICHIMOKU({},{},{})", tenkan, kijun, senkou_b),
            IndicatorType::ParabolicSar { step, max_step } => {
                write!(f, "PSAR({},{})", step.normalize(), max_step.normalize())
            }
        }
    }
}

/// Current value of `indicator_type` at the last bar of `bars`.
pub fn compute(indicator_type: &IndicatorType, bars: &[Bar]) -> IndicatorValue {
    match indicator_type {
        IndicatorType::Sma(period) => IndicatorValue::Simple(sma::calculate_sma(bars, *period)),
        IndicatorType::Ema(period) => IndicatorValue::Simple(ema::calculate_ema(bars, *period)),
        IndicatorType::Rsi(period) => IndicatorValue::Simple(rsi::calculate_rsi(bars, *period)),
        IndicatorType::Atr(period) => IndicatorValue::Simple(atr::calculate_atr(bars, *period)),
        IndicatorType::Bollinger { period, multiplier } => {
            bollinger::calculate_bollinger(bars, *period, *multiplier)
        }
        IndicatorType::Macd { fast, slow, signal } => {
            macd::calculate_macd(bars, *fast, *slow, *signal)
        }
        IndicatorType::Stochastic { k_period, d_period } => {
            stochastic::calculate_stochastic(bars, *k_period, *d_period)
        }
        IndicatorType::Adx(period) => adx::calculate_adx(bars, *period),
        IndicatorType::Cci(period) => IndicatorValue::Simple(cci::calculate_cci(bars, *period)),
        IndicatorType::WilliamsR(period) => {
            IndicatorValue::Simple(williams_r::calculate_williams_r(bars, *period))
        }
        IndicatorType::Obv => IndicatorValue::Simple(obv::calculate_obv(bars)),
        IndicatorType::Ichimoku {
            tenkan,
            kijun,
            senkou_b,
        } => ichimoku::calculate_ichimoku(bars, *tenkan, *kijun, *senkou_b),
        IndicatorType::ParabolicSar { step, max_step } => {
            IndicatorValue::Simple(psar::calculate_psar(bars, *step, *max_step))
        }
    }
}

pub(crate) fn closes(bars: &[Bar]) -> Vec<Decimal> {
    bars.iter().map(|b| b.close).collect()
}

/// Close of the last bar, or zero for an empty slice.
pub(crate) fn last_close(bars: &[Bar]) -> Decimal {
    bars.last().map(|b| b.close).unwrap_or(Decimal::ZERO)
}

/// Highest high and lowest low of a non-empty window.
pub(crate) fn high_low(window: &[Bar]) -> Option<(Decimal, Decimal)> {
    let first = window.first()?;
    Some(window.iter().fold((first.high, first.low), |(hh, ll), b| {
        (hh.max(b.high), ll.min(b.low))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn rising_bars(count: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
        (0..count)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i);
                Bar::new(
                    "ES",
                    start + Duration::minutes(i as i64),
                    close,
                    close + dec!(1),
                    close - dec!(1),
                    close,
                    1_000,
                )
            })
            .collect()
    }

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
        assert_eq!(
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .to_string(),
            "MACD(12,26,9)"
        );
        assert_eq!(
            IndicatorType::Bollinger {
                period: 20,
                multiplier: dec!(2.0)
            }
            .to_string(),
            "BOLLINGER(20,2)"
        );
        assert_eq!(IndicatorType::Obv.to_string(), "OBV");
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Ema(20), "ema20");
        map.insert(
            IndicatorType::Bollinger {
                period: 20,
                multiplier: dec!(2),
            },
            "bb",
        );

        assert_eq!(map.get(&IndicatorType::Ema(20)), Some(&"ema20"));
        assert_eq!(map.get(&IndicatorType::Ema(9)), None);
        assert_eq!(
            map.get(&IndicatorType::Bollinger {
                period: 20,
                multiplier: dec!(2),
            }),
            Some(&"bb")
        );
    }

    #[test]
    fn compute_is_deterministic() {
        let bars = rising_bars(80);
        let kinds = [
            IndicatorType::Ema(20),
            IndicatorType::Rsi(14),
            IndicatorType::Atr(14),
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            IndicatorType::Adx(14),
        ];
        for kind in &kinds {
            assert_eq!(compute(kind, &bars), compute(kind, &bars), "{kind}");
        }
    }

    #[test]
    fn compute_dispatches_to_simple_values() {
        let bars = rising_bars(30);
        assert_eq!(
            compute(&IndicatorType::Rsi(14), &bars),
            IndicatorValue::Simple(dec!(100))
        );
        assert!(matches!(
            compute(&IndicatorType::Stochastic {
                k_period: 14,
                d_period: 3
            }, &bars),
            IndicatorValue::Stochastic { .. }
        ));
    }

    #[test]
    fn high_low_of_window() {
        let bars = rising_bars(5);
        assert_eq!(high_low(&bars), Some((dec!(105), dec!(99))));
        assert_eq!(high_low(&[]), None);
    }
}
