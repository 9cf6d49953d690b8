//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvBarAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::condition::{CompiledCondition, Operand, ValueExpr};
use crate::domain::condition_parser::{self, parse_conditions};
use crate::domain::config_validation::{
    build_scan_config, build_strategy, build_symbol_table, parse_strategy_json, scan_dates,
    validate_scan_config,
};
use crate::domain::error::ScanError;
use crate::domain::scanner::{ScanRequest, Scanner};
use crate::domain::strategy::Strategy;
use crate::domain::summary::TradeSummary;
use crate::domain::symbol::SymbolTable;
use crate::domain::trade::TradeResult;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarPort;
use crate::ports::error_sink::TracingErrorSink;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "barscan",
    about = "Intraday strategy scanner and trade simulator"
)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan bar data for entries and simulate the resulting trades
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy file (INI or JSON); defaults to the [strategy] section of --config
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Comma-separated symbols, overriding [scan] symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Write trades and summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Leave setup and trade bars out of the JSON report
        #[arg(long)]
        omit_bars: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a strategy file or a ';'-separated condition list
    Validate {
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        #[arg(long)]
        conditions: Option<String>,
    },
    /// List contract specifications and available bar files
    Symbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan {
            config,
            strategy,
            symbol,
            output,
            omit_bars,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, strategy.as_deref(), symbol.as_deref())
            } else {
                run_scan(
                    &config,
                    strategy.as_deref(),
                    symbol.as_deref(),
                    output.as_deref(),
                    omit_bars,
                )
            }
        }
        Command::Validate {
            strategy,
            conditions,
        } => run_validate(strategy.as_deref(), conditions.as_deref()),
        Command::Symbols { config } => run_symbols(config.as_deref()),
    }
}

fn fail(err: ScanError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ScanError> {
    FileConfigAdapter::from_file(path).map_err(|e| ScanError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Strategy from a `.json` file, or from the `[strategy]` section of an INI.
pub fn load_strategy(path: &Path) -> Result<Strategy, ScanError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let content = fs::read_to_string(path)?;
        parse_strategy_json(&content)
    } else {
        build_strategy(&load_config(path)?)
    }
}

/// `--symbol` override, else `[scan] symbol`; both may be comma-separated.
pub fn resolve_symbols(symbol_override: Option<&str>, config: &dyn ConfigPort) -> Vec<String> {
    let raw = symbol_override
        .map(str::to_string)
        .or_else(|| config.get_string("scan", "symbol"))
        .unwrap_or_default();
    raw.split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

struct ScanSetup {
    config: FileConfigAdapter,
    strategy: Strategy,
    symbols: Vec<String>,
}

fn prepare(
    config_path: &Path,
    strategy_path: Option<&Path>,
    symbol_override: Option<&str>,
) -> Result<ScanSetup, ScanError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    validate_scan_config(&config)?;

    let strategy = match strategy_path {
        Some(path) => {
            eprintln!("Loading strategy from {}", path.display());
            load_strategy(path)?
        }
        None => build_strategy(&config)?,
    };
    eprintln!("Strategy: {} ({})", strategy.name, strategy.id);

    let symbols = resolve_symbols(symbol_override, &config);
    if symbols.is_empty() {
        return Err(ScanError::ConfigMissing {
            section: "scan".into(),
            key: "symbol".into(),
        });
    }

    Ok(ScanSetup {
        config,
        strategy,
        symbols,
    })
}

fn run_scan(
    config_path: &Path,
    strategy_path: Option<&Path>,
    symbol_override: Option<&str>,
    output_path: Option<&Path>,
    omit_bars: bool,
) -> ExitCode {
    let setup = match prepare(config_path, strategy_path, symbol_override) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let (scan_config, symbol_table, (start, end)) = match (
        build_scan_config(&setup.config),
        build_symbol_table(&setup.config),
        scan_dates(&setup.config),
    ) {
        (Ok(c), Ok(t), Ok(d)) => (c, t, d),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return fail(e),
    };
    let data_path = setup
        .config
        .get_string("data", "path")
        .map(|p| PathBuf::from(p.trim()))
        .unwrap_or_default();

    let data = CsvBarAdapter::new(data_path);
    let sink = TracingErrorSink;
    let scanner = Scanner::new(&data, &symbol_table, &sink, scan_config);

    let requests: Vec<ScanRequest> = setup
        .symbols
        .iter()
        .map(|symbol| ScanRequest {
            strategy: setup.strategy.clone(),
            symbol: symbol.clone(),
            start,
            end,
        })
        .collect();

    eprintln!(
        "Scanning {} symbol(s) from {} to {}...",
        requests.len(),
        start,
        end
    );

    let mut trades: Vec<TradeResult> = Vec::new();
    let mut first_error: Option<ScanError> = None;
    for (request, result) in requests.iter().zip(scanner.scan_batch(&requests)) {
        match result {
            Ok(found) => {
                eprintln!("  {}: {} trades", request.symbol, found.len());
                trades.extend(found);
            }
            Err(e) => {
                eprintln!("  {}: error: {}", request.symbol, e);
                first_error.get_or_insert(e);
            }
        }
    }

    for trade in &trades {
        println!("{}", format_trade(trade));
    }

    let summary = TradeSummary::compute(&trades);
    eprintln!("\n{summary}");

    if let Some(path) = output_path {
        let adapter = if omit_bars {
            JsonReportAdapter::without_bars()
        } else {
            JsonReportAdapter::new()
        };
        if let Err(e) = adapter.write(&trades, &summary, &path.display().to_string()) {
            return fail(e);
        }
        eprintln!("\nReport written to: {}", path.display());
    }

    match first_error {
        Some(e) if trades.is_empty() => (&e).into(),
        _ => ExitCode::SUCCESS,
    }
}

fn format_trade(trade: &TradeResult) -> String {
    format!(
        "{} {} {} {} @ {} -> {} @ {} {} pnl={} bars={}",
        trade.strategy_id,
        trade.symbol,
        trade.direction,
        trade.entry_time.format("%Y-%m-%d %H:%M"),
        trade.entry_price,
        trade.exit_time.format("%Y-%m-%d %H:%M"),
        trade.exit_price,
        trade.outcome,
        trade.pnl.round_dp(2),
        trade.bars_held
    )
}

/// Indicators a compiled condition reads, by display name.
fn indicators_used(compiled: &CompiledCondition) -> Vec<String> {
    let mut names = Vec::new();
    if let Operand::Indicator(r) = &compiled.left {
        names.push(r.indicator_type.to_string());
    }
    if let ValueExpr::Operand(Operand::Indicator(r)) = &compiled.right {
        names.push(r.indicator_type.to_string());
    }
    names
}

pub fn run_dry_run(
    config_path: &Path,
    strategy_path: Option<&Path>,
    symbol_override: Option<&str>,
) -> ExitCode {
    let setup = match prepare(config_path, strategy_path, symbol_override) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    if let Err(e) = build_scan_config(&setup.config).and_then(|_| build_symbol_table(&setup.config))
    {
        return fail(e);
    }
    eprintln!("Config validated successfully");

    let mut indicators = BTreeSet::new();
    eprintln!("\nConditions (compiled):");
    for condition in &setup.strategy.conditions {
        match condition_parser::compile(condition) {
            Ok(compiled) => {
                eprintln!("  {}", condition);
                indicators.extend(indicators_used(&compiled));
            }
            Err(e) => {
                return fail(ScanError::StrategyInvalid {
                    reason: format!("condition '{}': {}", condition, e),
                });
            }
        }
    }

    eprintln!("\nIndicators to compute:");
    for name in &indicators {
        eprintln!("  {}", name);
    }

    eprintln!("\nSymbols: {}", setup.symbols.join(", "));
    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(strategy_path: Option<&Path>, conditions: Option<&str>) -> ExitCode {
    if strategy_path.is_none() && conditions.is_none() {
        eprintln!("error: pass --strategy and/or --conditions");
        return ExitCode::from(1);
    }

    if let Some(path) = strategy_path {
        eprintln!("Validating strategy: {}", path.display());
        match load_strategy(path) {
            Ok(strategy) => {
                eprintln!("  {} ({}), {}", strategy.name, strategy.id, strategy.direction);
                for condition in &strategy.conditions {
                    eprintln!("  condition: {}", condition);
                }
                eprintln!(
                    "  stop: {} {}  target: {} {}",
                    strategy.stop_loss.value,
                    strategy.stop_loss.kind,
                    strategy.take_profit.value,
                    strategy.take_profit.kind
                );
            }
            Err(e) => return fail(e),
        }
    }

    if let Some(text) = conditions {
        eprintln!("\nConditions:");
        let parsed = match parse_conditions(text) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("  error: {}", e.display_with_context(text));
                return (&ScanError::from(e)).into();
            }
        };
        for condition in &parsed {
            match condition_parser::compile(condition) {
                Ok(_) => eprintln!("  ok: {}", condition),
                Err(e) => {
                    return fail(ScanError::StrategyInvalid {
                        reason: format!("condition '{}': {}", condition, e),
                    });
                }
            }
        }
    }

    eprintln!("\nStrategy is valid.");
    ExitCode::SUCCESS
}

fn run_symbols(config_path: Option<&Path>) -> ExitCode {
    let config = match config_path.map(load_config).transpose() {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let table = match &config {
        Some(c) => match build_symbol_table(c) {
            Ok(t) => t,
            Err(e) => return fail(e),
        },
        None => SymbolTable::builtin(),
    };

    println!("root\tpoint_value\ttick_size\ttick_value");
    for spec in table.iter() {
        println!(
            "{}\t{}\t{}\t{}",
            spec.root, spec.point_value, spec.tick_size, spec.tick_value
        );
    }

    let data_path = config
        .as_ref()
        .and_then(|c| c.get_string("data", "path"))
        .filter(|p| !p.trim().is_empty());
    if let Some(path) = data_path {
        let data = CsvBarAdapter::new(PathBuf::from(path.trim()));
        match data.list_symbols() {
            Ok(symbols) if symbols.is_empty() => eprintln!("\nNo bar files in {}", path),
            Ok(symbols) => {
                eprintln!("\nBar files in {}:", path);
                for symbol in &symbols {
                    let known = if table.get(symbol).is_some() { "" } else { " (unknown contract)" };
                    eprintln!("  {}{}", symbol, known);
                }
            }
            Err(e) => return fail(e),
        }
    }

    ExitCode::SUCCESS
}
