#![allow(dead_code)]

use barscan::domain::bar::Bar;
use barscan::domain::condition::Condition;
use barscan::domain::error::ScanError;
use barscan::domain::strategy::{Direction, ExitKind, ExitLevel, Strategy};
use barscan::ports::data_port::BarPort;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MockBarPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub requests: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
}

impl MockBarPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn requests(&self) -> Vec<(String, DateTime<Utc>, DateTime<Utc>)> {
        self.requests.lock().unwrap().clone()
    }
}

impl BarPort for MockBarPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, ScanError> {
        self.requests
            .lock()
            .unwrap()
            .push((symbol.to_string(), start, end));
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ScanError::BarData {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start && b.timestamp < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScanError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2024-06-03 13:30 UTC, the first bar of every generated series.
pub fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 13, 30, 0).unwrap()
}

/// Bar `index` minutes after [`session_start`].
pub fn make_bar(
    symbol: &str,
    index: usize,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
) -> Bar {
    Bar::new(
        symbol,
        session_start() + Duration::minutes(index as i64),
        open,
        high,
        low,
        close,
        1_000,
    )
}

/// `count` identical bars: close 100, high 100.5, low 99.5.
pub fn flat_series(symbol: &str, count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| make_bar(symbol, i, dec!(100), dec!(100.5), dec!(99.5), dec!(100)))
        .collect()
}

/// `high == low == close` bars.
pub fn degenerate_series(symbol: &str, count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| make_bar(symbol, i, dec!(100), dec!(100), dec!(100), dec!(100)))
        .collect()
}

/// Close rises one point per bar from 100.
pub fn rising_series(symbol: &str, count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = dec!(100) + Decimal::from(i);
            make_bar(symbol, i, close - dec!(0.5), close + dec!(0.5), close - dec!(1), close)
        })
        .collect()
}

/// Deterministic zig-zag with a 24-bar cycle and 12-point swing.
pub fn wave_series(symbol: &str, count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let phase = (i % 24) as i64;
            let offset = if phase < 12 { phase } else { 24 - phase };
            let close = dec!(100) + Decimal::from(offset);
            make_bar(symbol, i, close, close + dec!(1.5), close - dec!(1.5), close)
        })
        .collect()
}

pub fn strategy_with(conditions: Vec<Condition>, stop: Decimal, target: Decimal) -> Strategy {
    Strategy {
        id: "test-strategy".into(),
        name: "Test strategy".into(),
        direction: Direction::Long,
        conditions,
        stop_loss: ExitLevel::new(ExitKind::Points, stop),
        take_profit: ExitLevel::new(ExitKind::Points, target),
    }
}

pub fn always_long(stop: Decimal, target: Decimal) -> Strategy {
    strategy_with(vec![Condition::new("price", ">", "0")], stop, target)
}
