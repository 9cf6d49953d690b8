//! Condition evaluation.
//!
//! # Evaluation Semantics
//!
//! - `history` is ascending and its last element is the evaluated bar
//! - `>`, `<`, `>=`, `<=` compare directly; `=` means `|l - r| < 0.01`
//! - Arithmetic on user values is checked; overflow is an `EvalError`
//! - `crosses_above`: `prev_l <= prev_r && curr_l > curr_r`, `crosses_below`
//!   mirrors it. Only bars i-1 and i matter; with fewer than 2 bars it is
//!   false, not an error
//! - Entry is the AND of all conditions, short-circuiting on the first false
//! - Any evaluation error fails the entry closed and is reported to the sink

use crate::domain::bar::Bar;
use crate::domain::condition::{
    Comparison, CompiledCondition, IndicatorField, IndicatorRef, Operand, ValueExpr,
};
use crate::domain::condition_parser;
use crate::domain::error::EvalError;
use crate::domain::indicator::{self, IndicatorValue, ema};
use crate::domain::strategy::Strategy;
use crate::ports::error_sink::{ErrorReport, ErrorSink};
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

const EQUALITY_TOLERANCE: Decimal = dec!(0.01);
const AVG_VOLUME_PERIOD: usize = 20;
const PREV_DAY_LOOKBACK_DAYS: i64 = 7;

pub fn evaluate(
    condition: &CompiledCondition,
    current_bar: &Bar,
    history: &[Bar],
) -> Result<bool, EvalError> {
    if history.is_empty() {
        return Err(EvalError::EmptyHistory);
    }

    if condition.comparison.is_crossover() {
        if history.len() < 2 {
            return Ok(false);
        }
        let prev_history = &history[..history.len() - 1];
        let prev_bar = &prev_history[prev_history.len() - 1];

        let left_curr = resolve_operand(&condition.left, current_bar, history)?;
        let right_curr = resolve_value(&condition.right, current_bar, history)?;
        let left_prev = resolve_operand(&condition.left, prev_bar, prev_history)?;
        let right_prev = resolve_value(&condition.right, prev_bar, prev_history)?;

        return Ok(match condition.comparison {
            Comparison::CrossesAbove => left_prev <= right_prev && left_curr > right_curr,
            _ => left_prev >= right_prev && left_curr < right_curr,
        });
    }

    let left = resolve_operand(&condition.left, current_bar, history)?;
    let right = resolve_value(&condition.right, current_bar, history)?;

    Ok(match condition.comparison {
        Comparison::Greater => left > right,
        Comparison::Less => left < right,
        Comparison::GreaterOrEqual => left >= right,
        Comparison::LessOrEqual => left <= right,
        Comparison::Equal => {
            let diff = left.checked_sub(right).ok_or_else(|| EvalError::Overflow {
                expression: format!("{} - {}", left, right),
            })?;
            diff.abs() < EQUALITY_TOLERANCE
        }
        Comparison::CrossesAbove | Comparison::CrossesBelow => false,
    })
}

pub fn resolve_value(
    expr: &ValueExpr,
    bar: &Bar,
    history: &[Bar],
) -> Result<Decimal, EvalError> {
    match expr {
        ValueExpr::Literal(v) => Ok(*v),
        ValueExpr::Multiple { factor, base } => {
            let base_value = resolve_operand(base, bar, history)?;
            factor
                .checked_mul(base_value)
                .ok_or_else(|| EvalError::Overflow {
                    expression: format!("{} x {}", factor, base_value),
                })
        }
        ValueExpr::ClockTime(minutes) => Ok(Decimal::from(*minutes)),
        ValueExpr::Operand(operand) => resolve_operand(operand, bar, history),
    }
}

/// Value of `operand` at `bar`, the last element of `history`.
pub fn resolve_operand(
    operand: &Operand,
    bar: &Bar,
    history: &[Bar],
) -> Result<Decimal, EvalError> {
    match operand {
        Operand::Price => Ok(bar.close),
        Operand::Open => Ok(bar.open),
        Operand::High => Ok(bar.high),
        Operand::Low => Ok(bar.low),
        Operand::Volume => Ok(bar.volume_decimal()),
        Operand::Time => Ok(Decimal::from(bar.minute_of_day())),
        Operand::Vwap => Ok(bar.vwap.unwrap_or_else(|| session_vwap(bar, history))),
        Operand::Ema(period) => {
            let column = match *period {
                9 => bar.ema9,
                20 => bar.ema20,
                50 => bar.ema50,
                _ => None,
            };
            Ok(column.unwrap_or_else(|| ema::calculate_ema(history, *period)))
        }
        Operand::AvgVolume20 => Ok(bar
            .avg_volume20
            .unwrap_or_else(|| average_volume(history, AVG_VOLUME_PERIOD))),
        Operand::PrevDayHigh => previous_day_range(bar, history)
            .map(|(high, _)| high)
            .ok_or_else(|| EvalError::MissingData {
                what: "prev_day_high".to_string(),
                timestamp: bar.timestamp,
            }),
        Operand::PrevDayLow => previous_day_range(bar, history)
            .map(|(_, low)| low)
            .ok_or_else(|| EvalError::MissingData {
                what: "prev_day_low".to_string(),
                timestamp: bar.timestamp,
            }),
        Operand::Indicator(ind_ref) => resolve_indicator(ind_ref, history),
    }
}

fn resolve_indicator(ind_ref: &IndicatorRef, history: &[Bar]) -> Result<Decimal, EvalError> {
    let value = indicator::compute(&ind_ref.indicator_type, history);
    extract_field(&value, ind_ref.field).ok_or_else(|| {
        EvalError::UnknownIndicator(format!("{} {:?}", ind_ref.indicator_type, ind_ref.field))
    })
}

fn extract_field(value: &IndicatorValue, field: IndicatorField) -> Option<Decimal> {
    let v = match (value, field) {
        (IndicatorValue::Simple(v), IndicatorField::Value) => *v,
        (IndicatorValue::Macd { line, .. }, IndicatorField::MacdLine) => *line,
        (IndicatorValue::Macd { signal, .. }, IndicatorField::MacdSignal) => *signal,
        (IndicatorValue::Macd { histogram, .. }, IndicatorField::MacdHistogram) => *histogram,
        (IndicatorValue::Stochastic { k, .. }, IndicatorField::StochasticK) => *k,
        (IndicatorValue::Stochastic { d, .. }, IndicatorField::StochasticD) => *d,
        (IndicatorValue::Bollinger { upper, .. }, IndicatorField::BollingerUpper) => *upper,
        (IndicatorValue::Bollinger { middle, .. }, IndicatorField::BollingerMiddle) => *middle,
        (IndicatorValue::Bollinger { lower, .. }, IndicatorField::BollingerLower) => *lower,
        (IndicatorValue::Adx { adx, .. }, IndicatorField::Adx) => *adx,
        (IndicatorValue::Adx { plus_di, .. }, IndicatorField::PlusDi) => *plus_di,
        (IndicatorValue::Adx { minus_di, .. }, IndicatorField::MinusDi) => *minus_di,
        (IndicatorValue::Ichimoku { tenkan, .. }, IndicatorField::Tenkan) => *tenkan,
        (IndicatorValue::Ichimoku { kijun, .. }, IndicatorField::Kijun) => *kijun,
        (IndicatorValue::Ichimoku { senkou_a, .. }, IndicatorField::SenkouA) => *senkou_a,
        (IndicatorValue::Ichimoku { senkou_b, .. }, IndicatorField::SenkouB) => *senkou_b,
        _ => return None,
    };
    Some(v)
}

/// Volume-weighted typical price over the bars of `bar`'s UTC day that are
/// in `history`. Falls back to the bar's close when that volume is zero.
fn session_vwap(bar: &Bar, history: &[Bar]) -> Decimal {
    let day = bar.date();
    let (pv, volume) = history
        .iter()
        .rev()
        .take_while(|b| b.date() == day)
        .fold((Decimal::ZERO, Decimal::ZERO), |(pv, vol), b| {
            let v = b.volume_decimal();
            (pv + b.typical_price() * v, vol + v)
        });
    if volume.is_zero() {
        bar.close
    } else {
        pv / volume
    }
}

/// Mean volume of the last `period` bars (fewer if history is shorter).
fn average_volume(history: &[Bar], period: usize) -> Decimal {
    let window = &history[history.len().saturating_sub(period)..];
    if window.is_empty() {
        return Decimal::ZERO;
    }
    window.iter().map(Bar::volume_decimal).sum::<Decimal>() / Decimal::from(window.len())
}

/// High and low of the most recent earlier UTC day with bars, at most
/// seven days back.
fn previous_day_range(bar: &Bar, history: &[Bar]) -> Option<(Decimal, Decimal)> {
    let today = bar.date();
    let earliest = today - Duration::days(PREV_DAY_LOOKBACK_DAYS);
    let mut earlier = history.iter().rev().skip_while(|b| b.date() >= today);

    let first = earlier.next()?;
    let day = first.date();
    if day < earliest {
        return None;
    }

    let range = earlier
        .take_while(|b| b.date() == day)
        .fold((first.high, first.low), |(high, low), b| {
            (high.max(b.high), low.min(b.low))
        });
    Some(range)
}

/// A strategy's conditions compiled once for a whole scan.
#[derive(Debug, Clone)]
pub struct EntryEvaluator {
    strategy_id: String,
    conditions: Vec<CompiledCondition>,
    valid: bool,
}

impl EntryEvaluator {
    /// Compile every condition, reporting each failure once. A strategy with
    /// any uncompilable condition (or none at all) never signals.
    pub fn compile(strategy: &Strategy, sink: &dyn ErrorSink) -> Self {
        let mut conditions = Vec::with_capacity(strategy.conditions.len());
        let mut valid = !strategy.conditions.is_empty();

        for condition in &strategy.conditions {
            match condition_parser::compile(condition) {
                Ok(compiled) => conditions.push(compiled),
                Err(err) => {
                    valid = false;
                    sink.report(ErrorReport::from_eval(
                        &err,
                        "condition_parser",
                        &strategy.id,
                        Some(condition.to_string()),
                    ));
                }
            }
        }

        EntryEvaluator {
            strategy_id: strategy.id.clone(),
            conditions,
            valid,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_entry(&self, current_bar: &Bar, history: &[Bar], sink: &dyn ErrorSink) -> bool {
        if !self.valid {
            return false;
        }
        for condition in &self.conditions {
            match evaluate(condition, current_bar, history) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(err) => {
                    debug!(
                        strategy_id = %self.strategy_id,
                        condition = %condition.source,
                        "condition failed: {}",
                        err
                    );
                    sink.report(
                        ErrorReport::from_eval(
                            &err,
                            "condition_eval",
                            &self.strategy_id,
                            Some(condition.source.to_string()),
                        )
                        .with_context("symbol", &current_bar.symbol)
                        .with_context("timestamp", current_bar.timestamp.to_rfc3339()),
                    );
                    return false;
                }
            }
        }
        true
    }
}

/// Whether every condition of `strategy` holds at `current_bar`.
///
/// Never fails: problems are reported to `sink` and yield `false`.
pub fn evaluate_entry(
    strategy: &Strategy,
    current_bar: &Bar,
    history: &[Bar],
    sink: &dyn ErrorSink,
) -> bool {
    EntryEvaluator::compile(strategy, sink).is_entry(current_bar, history, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::Condition;
    use crate::domain::strategy::{Direction, ExitKind, ExitLevel};
    use crate::ports::error_sink::{ErrorType, MemoryErrorSink};
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn make_bar(timestamp: DateTime<Utc>, close: Decimal, volume: i64) -> Bar {
        Bar::new(
            "ES",
            timestamp,
            close,
            close + dec!(1),
            close - dec!(1),
            close,
            volume,
        )
    }

    fn series(closes: &[Decimal]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| make_bar(ts(4, 14, 0) + Duration::minutes(i as i64), c, 100))
            .collect()
    }

    fn compiled(indicator: &str, operator: &str, value: &str) -> CompiledCondition {
        condition_parser::compile(&Condition::new(indicator, operator, value)).unwrap()
    }

    fn check(cond: &CompiledCondition, history: &[Bar]) -> Result<bool, EvalError> {
        evaluate(cond, &history[history.len() - 1], history)
    }

    fn strategy(conditions: Vec<Condition>) -> Strategy {
        Strategy {
            id: "test-strategy".into(),
            name: "Test".into(),
            direction: Direction::Long,
            conditions,
            stop_loss: ExitLevel::new(ExitKind::Points, dec!(10)),
            take_profit: ExitLevel::new(ExitKind::Points, dec!(20)),
        }
    }

    #[test]
    fn direct_comparisons() {
        let bars = series(&[dec!(100)]);
        assert!(check(&compiled("price", ">", "99"), &bars).unwrap());
        assert!(!check(&compiled("price", "<", "99"), &bars).unwrap());
        assert!(check(&compiled("price", ">=", "100"), &bars).unwrap());
        assert!(check(&compiled("price", "<=", "100"), &bars).unwrap());
        assert!(check(&compiled("high", ">", "close"), &bars).unwrap());
    }

    #[test]
    fn equality_uses_tolerance() {
        let bars = series(&[dec!(100.005)]);
        assert!(check(&compiled("price", "=", "100"), &bars).unwrap());
        let bars = series(&[dec!(100.01)]);
        assert!(!check(&compiled("price", "=", "100"), &bars).unwrap());
    }

    #[test]
    fn flat_bar_comparisons() {
        let mut bar = make_bar(ts(4, 14, 0), dec!(50), 10);
        bar.high = dec!(50);
        bar.low = dec!(50);
        let bars = vec![bar];
        assert!(check(&compiled("high", "=", "low"), &bars).unwrap());
        assert!(!check(&compiled("high", ">", "low"), &bars).unwrap());
    }

    #[test]
    fn crossover_needs_two_bars() {
        let bars = series(&[dec!(100)]);
        assert!(!check(&compiled("price", "crosses_above", "50"), &bars).unwrap());
    }

    #[test]
    fn crosses_above_and_below() {
        let up = series(&[dec!(99), dec!(101)]);
        assert!(check(&compiled("price", "crosses_above", "100"), &up).unwrap());
        assert!(!check(&compiled("price", "crosses_below", "100"), &up).unwrap());

        let touch_then_up = series(&[dec!(100), dec!(101)]);
        assert!(check(&compiled("price", "crosses_above", "100"), &touch_then_up).unwrap());

        let already_above = series(&[dec!(101), dec!(102)]);
        assert!(!check(&compiled("price", "crosses_above", "100"), &already_above).unwrap());

        let down = series(&[dec!(101), dec!(99)]);
        assert!(check(&compiled("price", "crosses_below", "100"), &down).unwrap());
    }

    #[test]
    fn crossover_depends_only_on_last_two_bars() {
        let cond = compiled("price", "crosses_above", "100");
        let short = series(&[dec!(99), dec!(101)]);
        let long = series(&[dec!(150), dec!(20), dec!(130), dec!(99), dec!(101)]);
        assert_eq!(check(&cond, &short).unwrap(), check(&cond, &long).unwrap());
    }

    #[test]
    fn time_against_clock_value() {
        let bars = vec![make_bar(ts(4, 9, 45), dec!(10), 1)];
        assert!(check(&compiled("time", ">=", "9:30"), &bars).unwrap());
        assert!(!check(&compiled("time", ">=", "10:00"), &bars).unwrap());
    }

    #[test]
    fn volume_multiplier_uses_column_or_history() {
        let mut bars = series(&[dec!(1), dec!(1), dec!(1), dec!(1)]);
        bars[3].volume = 200;
        // mean of 100, 100, 100, 200 = 125; 1.5x = 187.5
        assert!(check(&compiled("volume", ">", "1.5x_avgVolume20"), &bars).unwrap());

        bars[3].avg_volume20 = Some(dec!(150));
        assert!(!check(&compiled("volume", ">", "1.5x_avgVolume20"), &bars).unwrap());
    }

    #[test]
    fn vwap_column_or_session_fallback() {
        let mut bars = vec![
            make_bar(ts(3, 20, 0), dec!(500), 1_000),
            make_bar(ts(4, 14, 0), dec!(100), 100),
            make_bar(ts(4, 14, 1), dec!(110), 300),
        ];
        // previous day's bar excluded: (100*100 + 110*300) / 400 = 107.5
        let vwap = resolve_operand(&Operand::Vwap, &bars[2], &bars).unwrap();
        assert_eq!(vwap, dec!(107.5));

        bars[2].vwap = Some(dec!(111));
        let vwap = resolve_operand(&Operand::Vwap, &bars[2], &bars).unwrap();
        assert_eq!(vwap, dec!(111));
    }

    #[test]
    fn ema_column_preferred() {
        let mut bars = series(&[dec!(10); 30]);
        let last = bars.len() - 1;
        assert_eq!(
            resolve_operand(&Operand::Ema(20), &bars[last], &bars).unwrap(),
            dec!(10)
        );
        bars[last].ema20 = Some(dec!(42));
        assert_eq!(
            resolve_operand(&Operand::Ema(20), &bars[last], &bars).unwrap(),
            dec!(42)
        );
    }

    #[test]
    fn previous_day_high_low() {
        let bars = vec![
            make_bar(ts(1, 15, 0), dec!(90), 1),
            make_bar(ts(1, 15, 1), dec!(95), 1),
            make_bar(ts(4, 14, 0), dec!(100), 1),
        ];
        // most recent earlier day is the 1st: highs 91/96, lows 89/94
        assert_eq!(
            resolve_operand(&Operand::PrevDayHigh, &bars[2], &bars).unwrap(),
            dec!(96)
        );
        assert_eq!(
            resolve_operand(&Operand::PrevDayLow, &bars[2], &bars).unwrap(),
            dec!(89)
        );
    }

    #[test]
    fn previous_day_missing_is_error() {
        let bars = series(&[dec!(100), dec!(101)]);
        let err = check(&compiled("price", ">", "prev_day_high"), &bars).unwrap_err();
        assert!(matches!(err, EvalError::MissingData { .. }));

        let stale = vec![
            make_bar(Utc.with_ymd_and_hms(2024, 2, 20, 15, 0, 0).unwrap(), dec!(90), 1),
            make_bar(ts(4, 14, 0), dec!(100), 1),
        ];
        assert!(resolve_operand(&Operand::PrevDayHigh, &stale[1], &stale).is_err());
    }

    #[test]
    fn indicator_fields_resolve() {
        let closes: Vec<Decimal> = (0..40).map(|i| dec!(100) + Decimal::from(i)).collect();
        let bars = series(&closes);
        assert!(check(&compiled("rsi", ">", "70"), &bars).unwrap());
        // linear trend: both EMAs lag by a constant, so the histogram is flat
        assert!(check(&compiled("macd_histogram", "=", "0"), &bars).unwrap());
        assert!(check(&compiled("bb_upper", ">", "bb_lower"), &bars).unwrap());
        assert!(check(&compiled("price", ">", "sma(20)"), &bars).unwrap());
    }

    #[test]
    fn empty_history_is_error() {
        let bar = make_bar(ts(4, 14, 0), dec!(1), 1);
        let err = evaluate(&compiled("price", ">", "0"), &bar, &[]).unwrap_err();
        assert_eq!(err, EvalError::EmptyHistory);
    }

    #[test]
    fn entry_is_and_of_conditions() {
        let bars = series(&[dec!(100), dec!(101)]);
        let sink = MemoryErrorSink::new();
        let last = &bars[1];

        let both = strategy(vec![
            Condition::new("price", ">", "0"),
            Condition::new("volume", ">=", "100"),
        ]);
        assert!(evaluate_entry(&both, last, &bars, &sink));

        let one_false = strategy(vec![
            Condition::new("price", ">", "0"),
            Condition::new("price", ">", "999999"),
        ]);
        assert!(!evaluate_entry(&one_false, last, &bars, &sink));
        assert!(sink.is_empty());
    }

    #[test]
    fn entry_fails_closed_and_reports() {
        let bars = series(&[dec!(100), dec!(101)]);
        let sink = MemoryErrorSink::new();
        let s = strategy(vec![
            Condition::new("price", ">", "0"),
            Condition::new("supertrend", ">", "1"),
        ]);

        assert!(!evaluate_entry(&s, &bars[1], &bars, &sink));
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].error_type, ErrorType::UnsupportedIndicator);
        assert_eq!(reports[0].strategy_id, "test-strategy");
        assert_eq!(reports[0].failed_expression.as_deref(), Some("supertrend > 1"));
    }

    #[test]
    fn runtime_errors_carry_bar_context() {
        let bars = series(&[dec!(100), dec!(101)]);
        let sink = MemoryErrorSink::new();
        let s = strategy(vec![Condition::new("price", ">", "prev_day_low")]);

        let evaluator = EntryEvaluator::compile(&s, &sink);
        assert!(evaluator.is_valid());
        assert!(!evaluator.is_entry(&bars[1], &bars, &sink));

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].error_type, ErrorType::MissingData);
        assert_eq!(reports[0].context.get("symbol").map(String::as_str), Some("ES"));
        assert!(reports[0].context.contains_key("timestamp"));
    }

    #[test]
    fn multiplier_overflow_fails_closed() {
        let bars = series(&[dec!(100), dec!(101)]);
        let sink = MemoryErrorSink::new();
        let s = strategy(vec![Condition::new(
            "volume",
            ">",
            "79228162514264337593543950335x_avgVolume20",
        )]);

        assert!(!evaluate_entry(&s, &bars[1], &bars, &sink));
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].error_type, ErrorType::MalformedValue);
        assert!(reports[0].message.contains("overflow"));
    }

    #[test]
    fn equality_overflow_fails_closed() {
        let bars = series(&[dec!(100)]);
        let cond = compiled("price", "=", "-79228162514264337593543950335");
        assert!(matches!(
            check(&cond, &bars),
            Err(EvalError::Overflow { .. })
        ));

        let sink = MemoryErrorSink::new();
        let s = strategy(vec![Condition::new(
            "price",
            "=",
            "-79228162514264337593543950335",
        )]);
        assert!(!evaluate_entry(&s, &bars[0], &bars, &sink));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn no_conditions_never_signal() {
        let bars = series(&[dec!(100)]);
        let sink = MemoryErrorSink::new();
        assert!(!evaluate_entry(&strategy(vec![]), &bars[0], &bars, &sink));
    }
}
