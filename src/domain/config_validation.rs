//! Configuration validation and construction.
//!
//! Validates all config fields before a scan runs, then builds the scan
//! config, symbol table and strategy from them.

use crate::domain::condition::Condition;
use crate::domain::condition_parser::{self, parse_condition};
use crate::domain::error::ScanError;
use crate::domain::execution::{AtrStopMode, DEFAULT_COMMISSION};
use crate::domain::indicator::atr;
use crate::domain::scanner::{
    DEFAULT_MAX_BARS_IN_TRADE, DEFAULT_MIN_LOOKBACK, DEFAULT_SETUP_WINDOW, DEFAULT_WARMUP_DAYS,
    ScanConfig,
};
use crate::domain::strategy::{Direction, ExitKind, ExitLevel, Strategy};
use crate::domain::symbol::{SymbolSpec, SymbolTable};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ScanError {
    ScanError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> ScanError {
    ScanError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Non-empty trimmed value, or `None`.
fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn optional_decimal(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<Decimal>, ScanError> {
    non_empty(config, section, key)
        .map(|raw| {
            Decimal::from_str(&raw)
                .map_err(|_| invalid(section, key, format!("'{}' is not a number", raw)))
        })
        .transpose()
}

fn optional_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<i64>, ScanError> {
    non_empty(config, section, key)
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| invalid(section, key, format!("'{}' is not an integer", raw)))
        })
        .transpose()
}

pub fn validate_scan_config(config: &dyn ConfigPort) -> Result<(), ScanError> {
    validate_data_path(config)?;
    validate_symbol(config)?;
    scan_dates(config)?;
    validate_windows(config)?;
    validate_commission(config)?;
    parse_atr_stop_mode(config)?;
    Ok(())
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), ScanError> {
    non_empty(config, "data", "path")
        .map(|_| ())
        .ok_or_else(|| missing("data", "path"))
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), ScanError> {
    non_empty(config, "scan", "symbol")
        .map(|_| ())
        .ok_or_else(|| missing("scan", "symbol"))
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), ScanError> {
    let checks: [(&str, i64); 5] = [
        ("warmup_days", 0),
        ("min_lookback", 1),
        ("max_bars_in_trade", 1),
        ("setup_window", 0),
        ("history_window", 1),
    ];
    for (key, min) in checks {
        match optional_int(config, "scan", key)? {
            Some(value) if value < min => {
                return Err(invalid("scan", key, format!("{} must be at least {}", key, min)));
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), ScanError> {
    match optional_decimal(config, "scan", "commission")? {
        Some(value) if value < Decimal::ZERO => Err(invalid(
            "scan",
            "commission",
            "commission must be non-negative",
        )),
        _ => Ok(()),
    }
}

fn parse_atr_stop_mode(config: &dyn ConfigPort) -> Result<AtrStopMode, ScanError> {
    let mode = non_empty(config, "scan", "atr_stop_mode").unwrap_or_else(|| "proxy".to_string());
    match mode.to_ascii_lowercase().as_str() {
        "proxy" => Ok(AtrStopMode::PriceProxy),
        "live" => {
            let period = optional_int(config, "scan", "atr_period")?
                .unwrap_or(atr::DEFAULT_PERIOD as i64);
            if period < 1 {
                return Err(invalid("scan", "atr_period", "atr_period must be at least 1"));
            }
            Ok(AtrStopMode::Live {
                period: period as usize,
            })
        }
        other => Err(invalid(
            "scan",
            "atr_stop_mode",
            format!("unknown mode '{}', expected proxy or live", other),
        )),
    }
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, ScanError> {
    let raw = non_empty(config, "scan", key).ok_or_else(|| missing("scan", key))?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        invalid(
            "scan",
            key,
            format!("invalid {} format, expected YYYY-MM-DD", key),
        )
    })
}

/// Inclusive scan date range from `[scan] start_date` and `end_date`.
pub fn scan_dates(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), ScanError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    if start > end {
        return Err(invalid(
            "scan",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok((start, end))
}

pub fn build_scan_config(config: &dyn ConfigPort) -> Result<ScanConfig, ScanError> {
    validate_windows(config)?;
    validate_commission(config)?;

    let history_window = optional_int(config, "scan", "history_window")?.map(|v| v as usize);
    Ok(ScanConfig {
        warmup_days: config.get_int("scan", "warmup_days", DEFAULT_WARMUP_DAYS),
        min_lookback: config.get_int("scan", "min_lookback", DEFAULT_MIN_LOOKBACK as i64) as usize,
        max_bars_in_trade: config.get_int(
            "scan",
            "max_bars_in_trade",
            DEFAULT_MAX_BARS_IN_TRADE as i64,
        ) as usize,
        setup_window: config.get_int("scan", "setup_window", DEFAULT_SETUP_WINDOW as i64) as usize,
        history_window,
        commission: config.get_decimal("scan", "commission", DEFAULT_COMMISSION),
        atr_stop_mode: parse_atr_stop_mode(config)?,
    })
}

/// Built-in contract table with `[symbols] ROOT = point_value, tick_size,
/// tick_value` overrides applied.
pub fn build_symbol_table(config: &dyn ConfigPort) -> Result<SymbolTable, ScanError> {
    let mut table = SymbolTable::builtin();
    for key in config.keys("symbols") {
        let raw = non_empty(config, "symbols", &key).ok_or_else(|| missing("symbols", &key))?;
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        let [point_value, tick_size, tick_value] = parts.as_slice() else {
            return Err(invalid(
                "symbols",
                &key,
                "expected point_value, tick_size, tick_value",
            ));
        };
        let mut values = [Decimal::ZERO; 3];
        for (slot, text) in values.iter_mut().zip([point_value, tick_size, tick_value]) {
            *slot = Decimal::from_str(text)
                .ok()
                .filter(|v| *v > Decimal::ZERO)
                .ok_or_else(|| {
                    invalid("symbols", &key, format!("'{}' is not a positive number", text))
                })?;
        }
        table.insert(SymbolSpec::new(key, values[0], values[1], values[2]));
    }
    Ok(table)
}

fn parse_exit_level(
    config: &dyn ConfigPort,
    type_key: &str,
    value_key: &str,
) -> Result<ExitLevel, ScanError> {
    let kind = match non_empty(config, "strategy", type_key) {
        Some(raw) => ExitKind::from_str(&raw).map_err(|e| invalid("strategy", type_key, e))?,
        None => ExitKind::Points,
    };
    let value = optional_decimal(config, "strategy", value_key)?
        .ok_or_else(|| missing("strategy", value_key))?;
    Ok(ExitLevel::new(kind, value))
}

/// `condition1 .. conditionN` keys in numeric order.
fn condition_keys(config: &dyn ConfigPort) -> Vec<(usize, String)> {
    let mut keys: Vec<(usize, String)> = config
        .keys("strategy")
        .into_iter()
        .filter_map(|key| {
            let n = key.strip_prefix("condition")?.parse::<usize>().ok()?;
            Some((n, key))
        })
        .collect();
    keys.sort();
    keys
}

/// Strategy from the `[strategy]` section.
pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, ScanError> {
    let name = non_empty(config, "strategy", "name").unwrap_or_else(|| "Unnamed".to_string());
    let id = non_empty(config, "strategy", "id")
        .unwrap_or_else(|| name.to_ascii_lowercase().replace(' ', "-"));
    let direction = match non_empty(config, "strategy", "direction") {
        Some(raw) => Direction::from_str(&raw).map_err(|e| invalid("strategy", "direction", e))?,
        None => Direction::Long,
    };

    let mut conditions: Vec<Condition> = Vec::new();
    for (_, key) in condition_keys(config) {
        if let Some(line) = non_empty(config, "strategy", &key) {
            conditions.push(parse_condition(&line)?);
        }
    }

    let strategy = Strategy {
        id,
        name,
        direction,
        conditions,
        stop_loss: parse_exit_level(config, "stop_type", "stop_value")?,
        take_profit: parse_exit_level(config, "target_type", "target_value")?,
    };
    validate_strategy(&strategy)?;
    Ok(strategy)
}

/// Strategy from its JSON serde form.
pub fn parse_strategy_json(content: &str) -> Result<Strategy, ScanError> {
    let strategy: Strategy =
        serde_json::from_str(content).map_err(|e| ScanError::StrategyInvalid {
            reason: format!("invalid strategy JSON: {}", e),
        })?;
    validate_strategy(&strategy)?;
    Ok(strategy)
}

/// Conditions present and compilable, exit distances positive.
pub fn validate_strategy(strategy: &Strategy) -> Result<(), ScanError> {
    if strategy.conditions.is_empty() {
        return Err(ScanError::StrategyInvalid {
            reason: format!("strategy '{}' has no conditions", strategy.id),
        });
    }
    for condition in &strategy.conditions {
        condition_parser::compile(condition).map_err(|e| ScanError::StrategyInvalid {
            reason: format!("condition '{}': {}", condition, e),
        })?;
    }
    for (label, level) in [
        ("stop", &strategy.stop_loss),
        ("target", &strategy.take_profit),
    ] {
        if level.value <= Decimal::ZERO {
            return Err(ScanError::StrategyInvalid {
                reason: format!("{} value must be positive, got {}", label, level.value),
            });
        }
    }
    Ok(())
}
