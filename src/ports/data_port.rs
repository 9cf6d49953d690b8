//! Bar data access port.

use crate::domain::bar::Bar;
use crate::domain::error::ScanError;
use chrono::{DateTime, Utc};

pub trait BarPort: Send + Sync {
    /// Bars of `symbol` with `start <= timestamp < end`, ascending and free
    /// of duplicate timestamps. An unknown symbol yields an empty list.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, ScanError>;

    /// Symbols this source has data for.
    fn list_symbols(&self) -> Result<Vec<String>, ScanError>;
}
