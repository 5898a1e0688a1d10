//! CSV report adapter implementing ReportPort.
//!
//! Writes `trades.csv`, `equity.csv` and `skipped.csv` into the output
//! directory, creating it if needed.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use log::info;
use serde::Serialize;

use crate::domain::backtest::{BacktestResult, SkippedTrade};
use crate::domain::error::NetreturnError;
use crate::ports::report_port::ReportPort;

pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity.csv";
pub const SKIPPED_FILE: &str = "skipped.csv";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

#[derive(Serialize)]
struct SkippedRow<'a> {
    date: NaiveDate,
    symbol: &'a str,
    signal: String,
    shares: f64,
    price: f64,
    reason: &'a str,
}

impl<'a> From<&'a SkippedTrade> for SkippedRow<'a> {
    fn from(skip: &'a SkippedTrade) -> Self {
        SkippedRow {
            date: skip.date,
            symbol: &skip.symbol,
            signal: skip.signal.to_string(),
            shares: skip.shares,
            price: skip.price,
            reason: &skip.reason,
        }
    }
}

fn write_rows<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), NetreturnError> {
    let to_io = |e: csv::Error| NetreturnError::Io {
        reason: format!("failed to write {}: {e}", path.display()),
    };
    let mut writer = csv::Writer::from_path(path).map_err(to_io)?;
    for row in rows {
        writer.serialize(row).map_err(to_io)?;
    }
    writer.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), NetreturnError> {
        fs::create_dir_all(output_dir)?;

        let portfolio = &result.portfolio;
        write_rows(&output_dir.join(TRADES_FILE), portfolio.history())?;
        write_rows(&output_dir.join(EQUITY_FILE), portfolio.equity_curve())?;
        write_rows(
            &output_dir.join(SKIPPED_FILE),
            result.skipped.iter().map(SkippedRow::from),
        )?;

        info!(
            "Wrote {} trades, {} equity points, {} skips to {}",
            portfolio.history().len(),
            portfolio.equity_curve().len(),
            result.skipped.len(),
            output_dir.display()
        );
        Ok(())
    }
}
