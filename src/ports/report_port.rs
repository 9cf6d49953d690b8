//! Report output port trait.

use crate::domain::error::ScanError;
use crate::domain::summary::TradeSummary;
use crate::domain::trade::TradeResult;

/// Port for persisting the trades of a scan.
pub trait ReportPort {
    fn write(
        &self,
        trades: &[TradeResult],
        summary: &TradeSummary,
        output_path: &str,
    ) -> Result<(), ScanError>;
}
