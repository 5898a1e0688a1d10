//! Signal-generation interface consumed by the backtest loop.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

pub type SignalMap = BTreeMap<String, Signal>;

/// One symbol's bars up to and including the bar being processed.
#[derive(Debug, Clone, Copy)]
pub struct SymbolHistory<'a> {
    pub symbol: &'a str,
    pub bars: &'a [OhlcvBar],
}

impl SymbolHistory<'_> {
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

/// A trading strategy. Called once per timestamp with every symbol's history
/// so far; symbols missing from the returned map are treated as HOLD.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn parameters(&self) -> Vec<(&'static str, String)>;

    fn generate_signals(&mut self, history: &[SymbolHistory<'_>]) -> SignalMap;
}
