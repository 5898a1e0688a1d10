//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::{info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::domain::config_validation::{
    build_backtest_config, build_strategy_spec, validate_config,
};
use crate::domain::error::NetreturnError;
use crate::domain::metrics::{BenchmarkComparison, Metrics};
use crate::domain::strategies::StrategySpec;
use crate::domain::symbol_data::SymbolData;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "netreturn",
    about = "Backtest trading strategies after trading costs and taxes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <SYMBOL>.csv files
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated symbols; defaults to every file in --data
        #[arg(long)]
        symbols: Option<String>,
        /// Directory for trades.csv, equity.csv and skipped.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run every strategy with default parameters under the same costs and taxes
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            symbols,
            output,
        } => run_backtest(&config, &data, symbols.as_deref(), output.as_deref()),
        Command::Compare {
            config,
            data,
            symbols,
        } => run_compare(&config, &data, symbols.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, NetreturnError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Splits a comma-separated list, dropping blanks and duplicates.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let symbol = symbol.to_uppercase();
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

/// Fetches every requested symbol. Symbols without data are skipped with a
/// warning; it is an error only if nothing loads.
pub fn load_market_data(
    port: &dyn DataPort,
    symbols: Option<&str>,
    config: &BacktestConfig,
) -> Result<Vec<SymbolData>, NetreturnError> {
    let symbols = match symbols {
        Some(raw) => parse_symbols(raw),
        None => port.list_symbols()?,
    };

    let mut data = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        match port.fetch_ohlcv(symbol, config.start_date, config.end_date) {
            Ok(bars) if bars.is_empty() => warn!("skipping {symbol}: no bars in range"),
            Ok(bars) => data.push(SymbolData::new(symbol.clone(), bars)),
            Err(NetreturnError::NoData { .. }) => warn!("skipping {symbol}: no data file"),
            Err(e) => return Err(e),
        }
    }

    if data.is_empty() {
        return Err(NetreturnError::NoData {
            symbol: if symbols.is_empty() {
                "*".to_string()
            } else {
                symbols.join(",")
            },
        });
    }
    info!("Loaded {} of {} symbols", data.len(), symbols.len());
    Ok(data)
}

/// Runs each strategy on its own engine and portfolio, in parallel. Results come
/// back in the order of `specs`.
pub fn compare_strategies(
    data: &[SymbolData],
    specs: &[StrategySpec],
    config: &BacktestConfig,
) -> Result<Vec<BacktestResult>, NetreturnError> {
    let engine = BacktestEngine::new(config.clone())?;
    specs
        .par_iter()
        .map(|spec| {
            let mut strategy = spec.build()?;
            engine.run(data, strategy.as_mut())
        })
        .collect()
}

fn run_backtest(
    config_path: &Path,
    data_dir: &Path,
    symbols: Option<&str>,
    output: Option<&Path>,
) -> Result<(), NetreturnError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let spec = build_strategy_spec(&adapter)?;

    let data = load_market_data(&CsvAdapter::new(data_dir.to_path_buf()), symbols, &bt_config)?;

    let mut strategy = spec.build()?;
    let result = BacktestEngine::new(bt_config.clone())?.run(&data, strategy.as_mut())?;
    let metrics = Metrics::compute(&result, bt_config.risk_free_rate);

    print_summary(&result, &metrics, &bt_config);

    if let Some(dir) = output {
        CsvReportAdapter::new().write(&result, dir)?;
        println!("\nReport written to: {}", dir.display());
    }
    Ok(())
}

fn run_compare(
    config_path: &Path,
    data_dir: &Path,
    symbols: Option<&str>,
) -> Result<(), NetreturnError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let data = load_market_data(&CsvAdapter::new(data_dir.to_path_buf()), symbols, &bt_config)?;

    let specs = StrategySpec::defaults();
    info!("Comparing {} strategies", specs.len());
    let results = compare_strategies(&data, &specs, &bt_config)?;

    print_comparison(&results, bt_config.risk_free_rate);
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), NetreturnError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;
    let spec = build_strategy_spec(&adapter)?;
    println!("Configuration is valid (strategy: {})", spec.kind());
    Ok(())
}

fn print_summary(result: &BacktestResult, metrics: &Metrics, config: &BacktestConfig) {
    let currency = &config.cost.currency;
    println!("=== {} ===", result.strategy_name);
    if !result.parameters.is_empty() {
        let params: Vec<String> = result
            .parameters
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("Parameters:       {}", params.join(", "));
    }
    println!(
        "Period:           {} to {}",
        result.start_date, result.end_date
    );
    println!(
        "Initial Capital:  {:.2} {currency}",
        result.portfolio.initial_capital()
    );
    println!("Final Value:      {:.2} {currency}", metrics.final_value);
    println!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    println!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    println!("Volatility:       {:.2}%", metrics.volatility * 100.0);
    println!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    println!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    println!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    println!("Calmar Ratio:     {:.2}", metrics.calmar_ratio);
    println!("Recovery Factor:  {:.2}", metrics.recovery_factor);
    println!("Skewness:         {:.2}", metrics.skewness);
    println!("Kurtosis:         {:.2}", metrics.kurtosis);
    println!("Trades:           {}", metrics.num_trades);
    println!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    println!("Profit Factor:    {:.2}", metrics.profit_factor);
    println!(
        "Trading Costs:    {:.2} {currency}",
        metrics.total_trading_costs
    );
    println!(
        "Taxes Paid:       {:.2} {}",
        metrics.total_taxes_paid, config.tax.currency
    );
    if metrics.total_taxes_deferred > 0.0 {
        println!(
            "Taxes Deferred:   {:.2} {}",
            metrics.total_taxes_deferred, config.tax.currency
        );
    }
    let unrealized = result.unrealized_gain();
    if unrealized != 0.0 {
        println!("Unrealized Gain:  {unrealized:.2} {currency}");
    }
    println!("Skipped Signals:  {}", result.skipped.len());
}

/// Beta and alpha are measured against the first result, the buy and hold
/// baseline.
fn print_comparison(results: &[BacktestResult], risk_free_rate: f64) {
    let Some(baseline) = results.first() else {
        return;
    };
    let benchmark = baseline.portfolio.equity_curve();
    println!(
        "{:<26} {:>12} {:>9} {:>8} {:>8} {:>7} {:>10} {:>10} {:>6} {:>8}",
        "Strategy",
        "Final",
        "Return",
        "Sharpe",
        "MaxDD",
        "Trades",
        "Costs",
        "Taxes",
        "Beta",
        "Alpha"
    );
    for result in results {
        let m = Metrics::compute(result, risk_free_rate);
        let (beta, alpha) = BenchmarkComparison::compute(
            result.portfolio.equity_curve(),
            benchmark,
            risk_free_rate,
        )
        .map_or((0.0, 0.0), |cmp| (cmp.beta, cmp.alpha));
        println!(
            "{:<26} {:>12.2} {:>8.2}% {:>8.2} {:>7.1}% {:>7} {:>10.2} {:>10.2} {:>6.2} {:>7.2}%",
            result.strategy_name,
            m.final_value,
            m.total_return * 100.0,
            m.sharpe_ratio,
            m.max_drawdown * 100.0,
            m.num_trades,
            m.total_trading_costs,
            m.total_taxes_paid + m.total_taxes_deferred,
            beta,
            alpha * 100.0,
        );
    }
}
