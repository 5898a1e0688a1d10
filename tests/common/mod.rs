#![allow(dead_code)]

use chrono::NaiveDate;
use netreturn::domain::backtest::BacktestConfig;
use netreturn::domain::cost::CostConfig;
use netreturn::domain::error::NetreturnError;
pub use netreturn::domain::ohlcv::OhlcvBar;
use netreturn::domain::strategy::{Signal, SignalMap, Strategy, SymbolHistory};
use netreturn::domain::symbol_data::SymbolData;
use netreturn::domain::tax::TaxConfig;
use netreturn::ports::data_port::DataPort;
use std::collections::{BTreeMap, HashMap};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, NetreturnError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(NetreturnError::DataFormat {
                source_name: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(symbol)
            .ok_or_else(|| NetreturnError::NoData {
                symbol: symbol.to_string(),
            })?;
        Ok(bars
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, NetreturnError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Plays back a fixed list of signals keyed by date.
pub struct ScriptedStrategy {
    script: BTreeMap<NaiveDate, Vec<(String, Signal)>>,
}

impl ScriptedStrategy {
    pub fn new(entries: &[(&str, &str, Signal)]) -> Self {
        let mut script: BTreeMap<NaiveDate, Vec<(String, Signal)>> = BTreeMap::new();
        for &(day, symbol, signal) in entries {
            script
                .entry(parse_date(day))
                .or_default()
                .push((symbol.to_string(), signal));
        }
        Self { script }
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn generate_signals(&mut self, history: &[SymbolHistory<'_>]) -> SignalMap {
        let today = history.iter().filter_map(|h| h.bars.last()).map(|b| b.date).max();
        today
            .and_then(|d| self.script.get(&d))
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }
}

pub fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date: parse_date(date),
        open: close,
        high: close + 1.0,
        low: (close - 1.0).max(0.01),
        close,
        volume: 1000.0,
    }
}

pub fn make_symbol_data(symbol: &str, closes: &[(&str, f64)]) -> SymbolData {
    let bars = closes
        .iter()
        .map(|&(d, close)| make_bar(symbol, d, close))
        .collect();
    SymbolData::new(symbol, bars)
}

pub fn generate_bars(
    symbol: &str,
    start_date: &str,
    count: usize,
    start_price: f64,
) -> Vec<OhlcvBar> {
    let start = parse_date(start_date);
    (0..count)
        .map(|i| {
            let close = start_price + i as f64;
            OhlcvBar {
                symbol: symbol.to_string(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Oscillating closes: a sine wave around `mid` with the given amplitude.
pub fn generate_wave(
    symbol: &str,
    start_date: &str,
    count: usize,
    mid: f64,
    amplitude: f64,
) -> Vec<OhlcvBar> {
    let start = parse_date(start_date);
    (0..count)
        .map(|i| {
            let close = mid + amplitude * (i as f64 / 7.0).sin();
            OhlcvBar {
                symbol: symbol.to_string(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// FIXED 10 per trade, 25% tax, 10000 capital.
pub fn fixed_cost_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: 10_000.0,
        cost: CostConfig::fixed(10.0),
        tax: TaxConfig::flat(0.25),
        ..BacktestConfig::default()
    }
}

pub fn frictionless_config() -> BacktestConfig {
    BacktestConfig {
        cost: CostConfig {
            apply_to_buy: false,
            apply_to_sell: false,
            ..CostConfig::default()
        },
        tax: TaxConfig::flat(0.0),
        ..BacktestConfig::default()
    }
}
