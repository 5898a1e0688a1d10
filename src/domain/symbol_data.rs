//! Per-symbol bar series and the unified backtest timeline.

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub bars: Vec<OhlcvBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl SymbolData {
    /// `bars` must be sorted by date with no duplicates.
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Self {
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            symbol: symbol.into(),
            bars,
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn get_bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Bars dated on or before `date`.
    pub fn history_until(&self, date: NaiveDate) -> &[OhlcvBar] {
        let end = self.bars.partition_point(|bar| bar.date <= date);
        &self.bars[..end]
    }

    /// Copy restricted to bars inside `[start, end]`; open bounds keep everything.
    pub fn within(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let bars = self
            .bars
            .iter()
            .filter(|bar| start.is_none_or(|s| bar.date >= s))
            .filter(|bar| end.is_none_or(|e| bar.date <= e))
            .cloned()
            .collect();
        SymbolData::new(self.symbol.clone(), bars)
    }
}

pub fn build_unified_timeline(symbols: &[SymbolData]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = symbols
        .iter()
        .flat_map(|sd| sd.bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}
