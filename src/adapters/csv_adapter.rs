//! CSV file bar adapter.
//!
//! One file per symbol at `<base_path>/<SYMBOL>.csv` with a header row.
//! Required columns: `timestamp,open,high,low,close,volume`. Optional
//! pre-computed columns: `vwap,ema9,ema20,ema50,avg_volume20` (empty cells
//! are treated as absent).

use crate::domain::bar::Bar;
use crate::domain::error::ScanError;
use crate::ports::data_port::BarPort;
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvBarAdapter {
    base_path: PathBuf,
}

impl CsvBarAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    vwap: Option<usize>,
    ema9: Option<usize>,
    ema20: Option<usize>,
    ema50: Option<usize>,
    avg_volume20: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, ScanError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| ScanError::BarData {
                reason: format!("missing {} column", name),
            })
        };
        Ok(Columns {
            timestamp: require("timestamp")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
            vwap: find("vwap"),
            ema9: find("ema9"),
            ema20: find("ema20"),
            ema50: find("ema50"),
            avg_volume20: find("avg_volume20"),
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ScanError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| ScanError::BarData {
            reason: format!("invalid timestamp '{}': {}", value, e),
        })
}

fn field<'r>(record: &'r StringRecord, index: usize, name: &str) -> Result<&'r str, ScanError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| ScanError::BarData {
            reason: format!("missing {} value", name),
        })
}

fn parse_decimal(record: &StringRecord, index: usize, name: &str) -> Result<Decimal, ScanError> {
    let raw = field(record, index, name)?;
    Decimal::from_str(raw).map_err(|e| ScanError::BarData {
        reason: format!("invalid {} value '{}': {}", name, raw, e),
    })
}

fn parse_optional(
    record: &StringRecord,
    index: Option<usize>,
    name: &str,
) -> Result<Option<Decimal>, ScanError> {
    match index.and_then(|i| record.get(i)).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Decimal::from_str(raw)
            .map(Some)
            .map_err(|e| ScanError::BarData {
                reason: format!("invalid {} value '{}': {}", name, raw, e),
            }),
    }
}

fn parse_bar(symbol: &str, record: &StringRecord, cols: &Columns) -> Result<Bar, ScanError> {
    let timestamp = parse_timestamp(field(record, cols.timestamp, "timestamp")?)?;
    let volume_raw = field(record, cols.volume, "volume")?;
    let volume: i64 = volume_raw.parse().map_err(|e| ScanError::BarData {
        reason: format!("invalid volume value '{}': {}", volume_raw, e),
    })?;

    let mut bar = Bar::new(
        symbol,
        timestamp,
        parse_decimal(record, cols.open, "open")?,
        parse_decimal(record, cols.high, "high")?,
        parse_decimal(record, cols.low, "low")?,
        parse_decimal(record, cols.close, "close")?,
        volume,
    );
    bar.vwap = parse_optional(record, cols.vwap, "vwap")?;
    bar.ema9 = parse_optional(record, cols.ema9, "ema9")?;
    bar.ema20 = parse_optional(record, cols.ema20, "ema20")?;
    bar.ema50 = parse_optional(record, cols.ema50, "ema50")?;
    bar.avg_volume20 = parse_optional(record, cols.avg_volume20, "avg_volume20")?;

    if !bar.is_well_formed() || bar.volume < 0 {
        return Err(ScanError::BarData {
            reason: format!("malformed bar for {} at {}", symbol, timestamp),
        });
    }
    Ok(bar)
}

impl BarPort for CsvBarAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, ScanError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| ScanError::BarData {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| ScanError::BarData {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let cols = Columns::from_headers(headers)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| ScanError::BarData {
                reason: format!("CSV parse error: {}", e),
            })?;
            let bar = parse_bar(symbol, &record, &cols)?;
            if bar.timestamp >= start && bar.timestamp < end {
                bars.push(bar);
            }
        }

        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScanError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ScanError::BarData {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ScanError::BarData {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
