//! Simulated trade records.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorValue, adx, atr, ema, macd, rsi, sma};
use crate::domain::strategy::Direction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Win,
    Loss,
    Timeout,
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeOutcome::Win => "win",
            TradeOutcome::Loss => "loss",
            TradeOutcome::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Indicator readings at one point of a trade, kept for later analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub close: Decimal,
    pub rsi: Decimal,
    pub atr: Decimal,
    pub sma20: Decimal,
    pub ema20: Decimal,
    pub macd_histogram: Decimal,
    pub adx: Decimal,
}

impl IndicatorSnapshot {
    /// Default-period readings at the last bar of `history`, or `None` for an
    /// empty slice.
    pub fn capture(history: &[Bar]) -> Option<Self> {
        let bar = history.last()?;
        let macd_histogram = match macd::calculate_macd(
            history,
            macd::DEFAULT_FAST,
            macd::DEFAULT_SLOW,
            macd::DEFAULT_SIGNAL,
        ) {
            IndicatorValue::Macd { histogram, .. } => histogram,
            _ => Decimal::ZERO,
        };
        let adx = match adx::calculate_adx(history, adx::DEFAULT_PERIOD) {
            IndicatorValue::Adx { adx, .. } => adx,
            _ => Decimal::ZERO,
        };

        Some(IndicatorSnapshot {
            timestamp: bar.timestamp,
            close: bar.close,
            rsi: rsi::calculate_rsi(history, rsi::DEFAULT_PERIOD),
            atr: atr::calculate_atr(history, atr::DEFAULT_PERIOD),
            sma20: sma::calculate_sma(history, 20),
            ema20: bar
                .ema20
                .unwrap_or_else(|| ema::calculate_ema(history, 20)),
            macd_histogram,
            adx,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub strategy_id: String,
    pub symbol: String,
    /// Side actually simulated (`both` trades long).
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_time: DateTime<Utc>,
    pub exit_price: Decimal,
    pub stop_price: Decimal,
    pub target_price: Decimal,
    pub pnl: Decimal,
    pub outcome: TradeOutcome,
    pub bars_held: usize,
    /// Maximum adverse excursion in dollars (never positive).
    pub mae: Decimal,
    /// Maximum favorable excursion in dollars (never negative).
    pub mfe: Decimal,
    /// Target distance over stop distance.
    pub risk_reward: Decimal,
    pub setup_bars: Vec<Bar>,
    pub trade_bars: Vec<Bar>,
    pub entry_indicators: Option<IndicatorSnapshot>,
    pub exit_indicators: Option<IndicatorSnapshot>,
}
