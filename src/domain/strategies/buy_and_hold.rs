//! Buy on the first bar of each symbol and hold to the end. Benchmark.

use std::collections::BTreeSet;

use super::signal_each;
use crate::domain::strategy::{Signal, SignalMap, Strategy, SymbolHistory};

#[derive(Debug, Clone, Default)]
pub struct BuyAndHold {
    bought: BTreeSet<String>,
}

impl BuyAndHold {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "Buy and Hold"
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn generate_signals(&mut self, history: &[SymbolHistory<'_>]) -> SignalMap {
        signal_each(history, |h| {
            if h.bars.is_empty() || self.bought.contains(h.symbol) {
                Signal::Hold
            } else {
                self.bought.insert(h.symbol.to_string());
                Signal::Buy
            }
        })
    }
}
