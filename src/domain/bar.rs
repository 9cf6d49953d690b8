//! One-minute OHLCV bar representation.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vwap: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema9: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema20: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema50: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_volume20: Option<Decimal>,
}

impl Bar {
    /// Bar with only the OHLCV fields populated.
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: i64,
    ) -> Self {
        Bar {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            vwap: None,
            ema9: None,
            ema20: None,
            ema50: None,
            avg_volume20: None,
        }
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: Decimal) -> Decimal {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn volume_decimal(&self) -> Decimal {
        Decimal::from(self.volume)
    }

    /// Calendar day of the bar in UTC.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Minutes since UTC midnight.
    pub fn minute_of_day(&self) -> u32 {
        self.timestamp.hour() * 60 + self.timestamp.minute()
    }

    /// `high >= max(open, close, low)` and `low <= min(open, close, high)`.
    pub fn is_well_formed(&self) -> bool {
        self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close).min(self.high)
    }
}
