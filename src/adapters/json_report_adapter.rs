//! JSON trade report adapter.
//!
//! Writes `{ "summary": ..., "trades": [...] }` as pretty-printed JSON.

use crate::domain::error::ScanError;
use crate::domain::summary::TradeSummary;
use crate::domain::trade::TradeResult;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;

#[derive(Serialize)]
struct Report<'a> {
    summary: &'a TradeSummary,
    trades: &'a [TradeResult],
}

#[derive(Debug, Default)]
pub struct JsonReportAdapter {
    /// Drop `setup_bars` and `trade_bars` from each trade.
    pub omit_bars: bool,
}

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_bars() -> Self {
        Self { omit_bars: true }
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(
        &self,
        trades: &[TradeResult],
        summary: &TradeSummary,
        output_path: &str,
    ) -> Result<(), ScanError> {
        let slim: Vec<TradeResult>;
        let trades = if self.omit_bars {
            slim = trades
                .iter()
                .map(|t| TradeResult {
                    setup_bars: Vec::new(),
                    trade_bars: Vec::new(),
                    ..t.clone()
                })
                .collect();
            &slim[..]
        } else {
            trades
        };

        let json = serde_json::to_string_pretty(&Report { summary, trades })
            .map_err(std::io::Error::other)?;
        fs::write(output_path, json)?;
        Ok(())
    }
}
