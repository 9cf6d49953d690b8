//! Backtest scanner.
//!
//! Walks a symbol's bars one index at a time:
//!
//! ```text
//! Searching --entry signal--> InTrade --trade simulated--> Searching
//! ```
//!
//! - Bars before the scan start only warm up indicators
//! - The first candidate is at least `min_lookback` bars in
//! - A candidate needs `max_bars_in_trade` bars after it
//! - After a trade the index jumps past the exit bar, so trades never overlap

use crate::domain::bar::Bar;
use crate::domain::condition_eval::EntryEvaluator;
use crate::domain::error::ScanError;
use crate::domain::execution::{AtrStopMode, DEFAULT_COMMISSION, SimulationParams};
use crate::domain::simulator;
use crate::domain::strategy::Strategy;
use crate::domain::symbol::SymbolTable;
use crate::domain::trade::{IndicatorSnapshot, TradeResult};
use crate::ports::data_port::BarPort;
use crate::ports::error_sink::{ErrorReport, ErrorSink};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

pub const DEFAULT_WARMUP_DAYS: i64 = 5;
pub const DEFAULT_MIN_LOOKBACK: usize = 50;
pub const DEFAULT_MAX_BARS_IN_TRADE: usize = 100;
pub const DEFAULT_SETUP_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Calendar days fetched before the start date for indicator warm-up.
    pub warmup_days: i64,
    pub min_lookback: usize,
    /// Future window handed to the simulator.
    pub max_bars_in_trade: usize,
    /// Bars before the entry kept on each trade.
    pub setup_window: usize,
    /// Cap on the bars indicators see; `None` uses all prior bars.
    ///
    /// Uncapped evaluation costs O(n) per candidate. A cap bounds that, but
    /// seeded indicators (EMA, MACD, ADX, PSAR, OBV) then start from the
    /// window instead of the first fetched bar and can read differently.
    pub history_window: Option<usize>,
    /// Round-trip commission in dollars.
    pub commission: Decimal,
    pub atr_stop_mode: AtrStopMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            warmup_days: DEFAULT_WARMUP_DAYS,
            min_lookback: DEFAULT_MIN_LOOKBACK,
            max_bars_in_trade: DEFAULT_MAX_BARS_IN_TRADE,
            setup_window: DEFAULT_SETUP_WINDOW,
            history_window: None,
            commission: DEFAULT_COMMISSION,
            atr_stop_mode: AtrStopMode::PriceProxy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Searching,
    InTrade { entry_index: usize },
}

/// One independent scan for [`Scanner::scan_batch`].
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub strategy: Strategy,
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub struct Scanner<'a> {
    data: &'a dyn BarPort,
    symbols: &'a SymbolTable,
    sink: &'a dyn ErrorSink,
    config: ScanConfig,
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl<'a> Scanner<'a> {
    pub fn new(
        data: &'a dyn BarPort,
        symbols: &'a SymbolTable,
        sink: &'a dyn ErrorSink,
        config: ScanConfig,
    ) -> Self {
        Scanner {
            data,
            symbols,
            sink,
            config,
        }
    }

    /// Scan `symbol` from the start of `start` through the end of `end`.
    ///
    /// Fails only for an unknown symbol or a bar source error. A symbol with
    /// no bars yields an empty list.
    pub fn scan(
        &self,
        strategy: &Strategy,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradeResult>, ScanError> {
        let spec = self
            .symbols
            .get(symbol)
            .ok_or_else(|| ScanError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;
        let params =
            SimulationParams::for_symbol(spec, self.config.commission, self.config.atr_stop_mode);

        let scan_from = start_of_day(start);
        let fetch_from = scan_from - Duration::days(self.config.warmup_days);
        let fetch_to = start_of_day(end) + Duration::days(1);

        let bars = self.data.fetch_bars(symbol, fetch_from, fetch_to)?;
        debug!(symbol, bars = bars.len(), "fetched bars");

        let trades = self.scan_bars(strategy, &bars, scan_from, &params);
        info!(
            symbol,
            strategy_id = %strategy.id,
            trades = trades.len(),
            "scan complete"
        );
        Ok(trades)
    }

    /// Run independent scans in parallel. Results keep the request order.
    pub fn scan_batch(&self, requests: &[ScanRequest]) -> Vec<Result<Vec<TradeResult>, ScanError>> {
        requests
            .par_iter()
            .map(|req| self.scan(&req.strategy, &req.symbol, req.start, req.end))
            .collect()
    }

    /// Scan an in-memory bar series. Bars before `scan_from` are never entry
    /// candidates.
    pub fn scan_bars(
        &self,
        strategy: &Strategy,
        bars: &[Bar],
        scan_from: DateTime<Utc>,
        params: &SimulationParams,
    ) -> Vec<TradeResult> {
        let mut trades = Vec::new();
        if bars.is_empty() {
            return trades;
        }

        let evaluator = EntryEvaluator::compile(strategy, self.sink);
        if !evaluator.is_valid() {
            warn!(strategy_id = %strategy.id, "strategy has no usable conditions, skipping scan");
            return trades;
        }

        let horizon = self.config.max_bars_in_trade;
        let first_in_range = bars.partition_point(|b| b.timestamp < scan_from);
        let mut i = first_in_range.max(self.config.min_lookback);
        let mut state = ScanState::Searching;

        while i + horizon < bars.len() {
            match state {
                ScanState::Searching => {
                    if evaluator.is_entry(&bars[i], self.history(bars, i), self.sink) {
                        debug!(
                            symbol = %bars[i].symbol,
                            timestamp = %bars[i].timestamp,
                            "entry signal"
                        );
                        state = ScanState::InTrade { entry_index: i };
                    } else {
                        i += 1;
                    }
                }
                ScanState::InTrade { entry_index } => {
                    i = match self.run_trade(strategy, bars, entry_index, params) {
                        Some(trade) => {
                            let next = entry_index + trade.bars_held + 1;
                            trades.push(trade);
                            next
                        }
                        None => entry_index + 1,
                    };
                    state = ScanState::Searching;
                }
            }
        }

        trades
    }

    fn run_trade(
        &self,
        strategy: &Strategy,
        bars: &[Bar],
        entry_index: usize,
        params: &SimulationParams,
    ) -> Option<TradeResult> {
        let entry_bar = &bars[entry_index];
        let future_end = (entry_index + self.config.max_bars_in_trade).min(bars.len() - 1);
        let future = &bars[entry_index + 1..=future_end];

        match simulator::simulate(
            strategy,
            entry_bar,
            self.history(bars, entry_index),
            future,
            params,
        ) {
            Ok(Some(mut trade)) => {
                let exit_index = entry_index + trade.bars_held;
                trade.setup_bars =
                    bars[entry_index.saturating_sub(self.config.setup_window)..entry_index].to_vec();
                trade.exit_indicators = IndicatorSnapshot::capture(self.history(bars, exit_index));
                debug!(
                    symbol = %trade.symbol,
                    outcome = %trade.outcome,
                    pnl = %trade.pnl,
                    bars_held = trade.bars_held,
                    "trade closed"
                );
                Some(trade)
            }
            Ok(None) => {
                debug!(timestamp = %entry_bar.timestamp, "no future bars, candidate skipped");
                None
            }
            Err(err) => {
                warn!(timestamp = %entry_bar.timestamp, "simulation failed: {}", err);
                self.sink.report(
                    ErrorReport::from_simulation(&err, &strategy.id)
                        .with_context("symbol", &entry_bar.symbol)
                        .with_context("timestamp", entry_bar.timestamp.to_rfc3339()),
                );
                None
            }
        }
    }

    /// Bars visible when evaluating index `i`.
    fn history<'b>(&self, bars: &'b [Bar], i: usize) -> &'b [Bar] {
        let end = i + 1;
        let start = match self.config.history_window {
            Some(window) => end.saturating_sub(window),
            None => 0,
        };
        &bars[start..end]
    }
}
