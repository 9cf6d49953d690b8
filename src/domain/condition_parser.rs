//! Condition compiler.
//!
//! Turns the user's `indicator operator value` strings into the typed
//! `CompiledCondition` the evaluator runs. Names are case-insensitive and
//! accept suffix (`sma20`, `sma_20`) and parameter (`sma(20)`,
//! `bb_upper(20, 2.5)`) forms.
//!
//! Right-hand values resolve in this order:
//! 1. a decimal literal (`30`, `-0.5`)
//! 2. a multiplier `<factor>x_<base>` with base `avgVolume20` or `vwap`
//! 3. a clock time `H:MM` / `HH:MM` (minutes since midnight)
//! 4. any left-hand operand name

use crate::domain::condition::{
    Comparison, CompiledCondition, Condition, IndicatorField, IndicatorRef, Operand, ValueExpr,
};
use crate::domain::error::{EvalError, ParseError};
use crate::domain::indicator::{IndicatorType, adx, atr, bollinger, cci, ichimoku, macd};
use crate::domain::indicator::{psar, rsi, stochastic, williams_r};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;
use std::sync::LazyLock;

const DEFAULT_MA_PERIOD: usize = 20;
/// Longest lookback accepted for any indicator parameter.
pub const MAX_PERIOD: usize = 10_000;

static MULTIPLIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([\d.]+)x_(\w+)$").ok());
static CLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").ok());

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if pred(ch) {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn take_word(&mut self) -> &'a str {
        self.take_while(|c| c.is_alphanumeric() || c == '_')
    }

    fn parse_number(&mut self) -> Result<Decimal, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        let digits = self.take_while(|c| c.is_ascii_digit() || c == '.');
        if digits.is_empty() {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }
        let num_str = &self.input[start..self.pos];
        Decimal::from_str(num_str).map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_args(&mut self) -> Result<Vec<Decimal>, ParseError> {
        self.expect_char('(')?;
        let mut args = vec![self.parse_number()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                return Ok(args);
            }
            self.expect_char(',')?;
            args.push(self.parse_number()?);
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.take_word();
        if word.is_empty() {
            return Err(ParseError {
                message: "expected indicator name".to_string(),
                position: start,
            });
        }
        self.skip_whitespace();
        let args = if self.peek() == Some('(') {
            self.parse_args()?
        } else {
            Vec::new()
        };
        operand_for(&word.to_ascii_lowercase(), &args).map_err(|message| ParseError {
            message,
            position: start,
        })
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError {
                message: format!("unexpected input: '{}'", self.remaining()),
                position: self.pos,
            });
        }
        Ok(())
    }

    /// Left-hand text up to whitespace or an operator symbol outside
    /// parentheses.
    fn take_indicator_text(&mut self) -> &'a str {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(ch) = self.peek() {
            match ch {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                '<' | '>' | '=' if depth == 0 => break,
                c if c.is_whitespace() && depth == 0 => break,
                _ => {}
            }
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        self.skip_whitespace();
        let indicator = self.take_indicator_text();
        if indicator.is_empty() {
            return Err(ParseError {
                message: "expected indicator".to_string(),
                position: self.pos,
            });
        }

        self.skip_whitespace();
        let operator = match self.peek() {
            Some('<' | '>' | '=') => self.take_while(|c| matches!(c, '<' | '>' | '=')),
            _ => self.take_word(),
        };
        if operator.is_empty() {
            return Err(ParseError {
                message: format!(
                    "expected operator, found '{}'",
                    self.peek()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "end of input".to_string())
                ),
                position: self.pos,
            });
        }

        self.skip_whitespace();
        let value = self.remaining().trim_end();
        if value.is_empty() {
            return Err(ParseError {
                message: "expected value".to_string(),
                position: self.pos,
            });
        }

        Ok(Condition::new(indicator, operator, value))
    }
}

fn bare(name: &str, args: &[Decimal], operand: Operand) -> Result<Operand, String> {
    if args.is_empty() {
        Ok(operand)
    } else {
        Err(format!("'{}' takes no parameters", name))
    }
}

fn check_arity(name: &str, args: &[Decimal], max: usize) -> Result<(), String> {
    if args.len() > max {
        return Err(format!(
            "'{}' takes at most {} parameter(s), got {}",
            name,
            max,
            args.len()
        ));
    }
    Ok(())
}

fn period(args: &[Decimal], idx: usize, default: usize) -> Result<usize, String> {
    match args.get(idx) {
        None => Ok(default),
        Some(v) if v.fract().is_zero() && v.is_sign_positive() && !v.is_zero() => v
            .to_usize()
            .filter(|p| *p <= MAX_PERIOD)
            .ok_or_else(|| format!("period out of range (max {}): {}", MAX_PERIOD, v)),
        Some(v) => Err(format!("period must be a positive integer, got {}", v)),
    }
}

fn positive(args: &[Decimal], idx: usize, default: Decimal) -> Result<Decimal, String> {
    match args.get(idx) {
        None => Ok(default),
        Some(v) if *v > Decimal::ZERO => Ok(*v),
        Some(v) => Err(format!("parameter must be positive, got {}", v)),
    }
}

/// `ema9` → (`ema`, [9]); `sma_20` → (`sma`, [20]).
fn split_period_suffix(name: &str) -> Option<(&str, Decimal)> {
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if base.len() == name.len() || base.is_empty() {
        return None;
    }
    let digits = &name[base.len()..];
    let base = base.strip_suffix('_').unwrap_or(base);
    Some((base, Decimal::from_str(digits).ok()?))
}

fn operand_for(name: &str, args: &[Decimal]) -> Result<Operand, String> {
    match name {
        "price" | "close" => bare(name, args, Operand::Price),
        "open" => bare(name, args, Operand::Open),
        "high" => bare(name, args, Operand::High),
        "low" => bare(name, args, Operand::Low),
        "volume" => bare(name, args, Operand::Volume),
        "vwap" => bare(name, args, Operand::Vwap),
        "time" => bare(name, args, Operand::Time),
        "avg_volume20" | "avgvolume20" => bare(name, args, Operand::AvgVolume20),
        "prev_day_high" => bare(name, args, Operand::PrevDayHigh),
        "prev_day_low" => bare(name, args, Operand::PrevDayLow),
        _ => match split_period_suffix(name) {
            Some((base, suffix)) if args.is_empty() => indicator_operand(base, &[suffix]),
            _ => indicator_operand(name, args),
        },
    }
}

fn indicator_operand(name: &str, args: &[Decimal]) -> Result<Operand, String> {
    let single = |default: usize| -> Result<usize, String> {
        check_arity(name, args, 1)?;
        period(args, 0, default)
    };
    let with_field =
        |indicator_type: IndicatorType, field: IndicatorField| -> Result<Operand, String> {
            Ok(Operand::Indicator(IndicatorRef {
                indicator_type,
                field,
            }))
        };

    match name {
        "sma" => with_field(
            IndicatorType::Sma(single(DEFAULT_MA_PERIOD)?),
            IndicatorField::Value,
        ),
        "ema" => {
            let n = single(DEFAULT_MA_PERIOD)?;
            if matches!(n, 9 | 20 | 50) {
                Ok(Operand::Ema(n))
            } else {
                with_field(IndicatorType::Ema(n), IndicatorField::Value)
            }
        }
        "rsi" => with_field(
            IndicatorType::Rsi(single(rsi::DEFAULT_PERIOD)?),
            IndicatorField::Value,
        ),
        "atr" => with_field(
            IndicatorType::Atr(single(atr::DEFAULT_PERIOD)?),
            IndicatorField::Value,
        ),
        "cci" => with_field(
            IndicatorType::Cci(single(cci::DEFAULT_PERIOD)?),
            IndicatorField::Value,
        ),
        "williams_r" | "willr" => with_field(
            IndicatorType::WilliamsR(single(williams_r::DEFAULT_PERIOD)?),
            IndicatorField::Value,
        ),
        "adx" | "plus_di" | "minus_di" => {
            let field = match name {
                "adx" => IndicatorField::Adx,
                "plus_di" => IndicatorField::PlusDi,
                _ => IndicatorField::MinusDi,
            };
            with_field(IndicatorType::Adx(single(adx::DEFAULT_PERIOD)?), field)
        }
        "obv" => {
            check_arity(name, args, 0)?;
            with_field(IndicatorType::Obv, IndicatorField::Value)
        }
        "bb_upper" | "bb_middle" | "bb_lower" => {
            check_arity(name, args, 2)?;
            let field = match name {
                "bb_upper" => IndicatorField::BollingerUpper,
                "bb_middle" => IndicatorField::BollingerMiddle,
                _ => IndicatorField::BollingerLower,
            };
            with_field(
                IndicatorType::Bollinger {
                    period: period(args, 0, bollinger::DEFAULT_PERIOD)?,
                    multiplier: positive(args, 1, bollinger::DEFAULT_MULTIPLIER)?,
                },
                field,
            )
        }
        "macd" | "macd_line" | "macd_signal" | "macd_histogram" | "macd_hist" => {
            check_arity(name, args, 3)?;
            let field = match name {
                "macd_signal" => IndicatorField::MacdSignal,
                "macd_histogram" | "macd_hist" => IndicatorField::MacdHistogram,
                _ => IndicatorField::MacdLine,
            };
            with_field(
                IndicatorType::Macd {
                    fast: period(args, 0, macd::DEFAULT_FAST)?,
                    slow: period(args, 1, macd::DEFAULT_SLOW)?,
                    signal: period(args, 2, macd::DEFAULT_SIGNAL)?,
                },
                field,
            )
        }
        "stoch_k" | "stoch_d" => {
            check_arity(name, args, 2)?;
            let field = if name == "stoch_k" {
                IndicatorField::StochasticK
            } else {
                IndicatorField::StochasticD
            };
            with_field(
                IndicatorType::Stochastic {
                    k_period: period(args, 0, stochastic::DEFAULT_K_PERIOD)?,
                    d_period: period(args, 1, stochastic::DEFAULT_D_PERIOD)?,
                },
                field,
            )
        }
        "ichimoku_tenkan" | "ichimoku_kijun" | "ichimoku_senkou_a" | "ichimoku_senkou_b" => {
            check_arity(name, args, 3)?;
            let field = match name {
                "ichimoku_tenkan" => IndicatorField::Tenkan,
                "ichimoku_kijun" => IndicatorField::Kijun,
                "ichimoku_senkou_a" => IndicatorField::SenkouA,
                _ => IndicatorField::SenkouB,
            };
            with_field(
                IndicatorType::Ichimoku {
                    tenkan: period(args, 0, ichimoku::DEFAULT_TENKAN)?,
                    kijun: period(args, 1, ichimoku::DEFAULT_KIJUN)?,
                    senkou_b: period(args, 2, ichimoku::DEFAULT_SENKOU_B)?,
                },
                field,
            )
        }
        "psar" | "sar" => {
            check_arity(name, args, 2)?;
            with_field(
                IndicatorType::ParabolicSar {
                    step: positive(args, 0, psar::DEFAULT_STEP)?,
                    max_step: positive(args, 1, psar::DEFAULT_MAX_STEP)?,
                },
                IndicatorField::Value,
            )
        }
        _ => Err(format!("unknown indicator '{}'", name)),
    }
}

/// Parse a left-hand operand name such as `close`, `rsi(7)` or `bb_lower`.
pub fn parse_operand(input: &str) -> Result<Operand, ParseError> {
    let mut parser = Parser::new(input);
    let operand = parser.parse_operand()?;
    parser.expect_end()?;
    Ok(operand)
}

pub fn parse_comparison(input: &str) -> Option<Comparison> {
    match input.trim().to_ascii_lowercase().as_str() {
        ">" => Some(Comparison::Greater),
        "<" => Some(Comparison::Less),
        ">=" => Some(Comparison::GreaterOrEqual),
        "<=" => Some(Comparison::LessOrEqual),
        "=" | "==" => Some(Comparison::Equal),
        "crosses_above" => Some(Comparison::CrossesAbove),
        "crosses_below" => Some(Comparison::CrossesBelow),
        _ => None,
    }
}

/// `1.5x_avgVolume20` → (`1.5`, `avgVolume20`).
fn split_multiplier(input: &str) -> Option<(&str, &str)> {
    let caps = MULTIPLIER.as_ref()?.captures(input)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// `9:30` → 570. `None` when the input is not clock-shaped.
fn parse_clock(input: &str) -> Option<Result<u32, String>> {
    let caps = CLOCK.as_ref()?.captures(input)?;
    let h: u32 = caps.get(1)?.as_str().parse().ok()?;
    let m: u32 = caps.get(2)?.as_str().parse().ok()?;
    if h > 23 || m > 59 {
        return Some(Err(format!("clock time out of range: {}", input)));
    }
    Some(Ok(h * 60 + m))
}

pub fn parse_value(input: &str) -> Result<ValueExpr, EvalError> {
    let text = input.trim();
    let malformed = |reason: String| EvalError::MalformedValue {
        expression: input.to_string(),
        reason,
    };

    if text.is_empty() {
        return Err(malformed("empty value".to_string()));
    }

    if let Ok(v) = Decimal::from_str(text) {
        return Ok(ValueExpr::Literal(v));
    }

    if let Some((factor, base)) = split_multiplier(text) {
        let factor = Decimal::from_str(factor)
            .map_err(|_| malformed(format!("invalid multiplier factor '{}'", factor)))?;
        let base = match base.to_ascii_lowercase().as_str() {
            "avgvolume20" | "avg_volume20" => Operand::AvgVolume20,
            "vwap" => Operand::Vwap,
            other => return Err(malformed(format!("unsupported multiplier base '{}'", other))),
        };
        return Ok(ValueExpr::Multiple { factor, base });
    }

    if let Some(minutes) = parse_clock(text) {
        return minutes.map(ValueExpr::ClockTime).map_err(malformed);
    }

    parse_operand(text)
        .map(ValueExpr::Operand)
        .map_err(|e| malformed(e.message))
}

/// Compile one raw condition. Called once per scan, never per bar.
pub fn compile(condition: &Condition) -> Result<CompiledCondition, EvalError> {
    let left = parse_operand(&condition.indicator)
        .map_err(|_| EvalError::UnknownIndicator(condition.indicator.clone()))?;
    let comparison = parse_comparison(&condition.operator)
        .ok_or_else(|| EvalError::UnknownOperator(condition.operator.clone()))?;
    let right = parse_value(&condition.value)?;
    Ok(CompiledCondition {
        left,
        comparison,
        right,
        source: condition.clone(),
    })
}

/// Parse a single `indicator operator value` line.
pub fn parse_condition(input: &str) -> Result<Condition, ParseError> {
    Parser::new(input).parse_condition()
}

/// Parse a `;`-separated list of condition lines. Blank entries are skipped;
/// error positions are relative to the whole input.
pub fn parse_conditions(input: &str) -> Result<Vec<Condition>, ParseError> {
    let mut conditions = Vec::new();
    let mut offset = 0;
    for part in input.split(';') {
        if !part.trim().is_empty() {
            let condition = parse_condition(part).map_err(|e| ParseError {
                message: e.message,
                position: e.position + offset,
            })?;
            conditions.push(condition);
        }
        offset += part.len() + 1;
    }
    Ok(conditions)
}
