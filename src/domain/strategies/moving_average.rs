//! Simple moving average crossover: golden cross buys, death cross sells.

use super::{crossover, invalid_param, signal_each};
use crate::domain::error::NetreturnError;
use crate::domain::indicator::sma;
use crate::domain::strategy::{Signal, SignalMap, Strategy, SymbolHistory};

#[derive(Debug, Clone)]
pub struct MovingAverageCrossover {
    short_window: usize,
    long_window: usize,
}

impl MovingAverageCrossover {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, NetreturnError> {
        if short_window == 0 {
            return Err(invalid_param("short_window", "short_window must be at least 1"));
        }
        if short_window >= long_window {
            return Err(invalid_param(
                "short_window",
                "short_window must be less than long_window",
            ));
        }
        Ok(Self {
            short_window,
            long_window,
        })
    }

    fn signal_for(&self, closes: &[f64]) -> Signal {
        // Need the long MA on both the previous and current bar.
        if closes.len() < self.long_window + 1 {
            return Signal::Hold;
        }
        let tail = &closes[closes.len() - self.long_window - 1..];
        let short = sma(tail, self.short_window);
        let long = sma(tail, self.long_window);
        let last = tail.len() - 1;
        match (short[last - 1], long[last - 1], short[last], long[last]) {
            (Some(ps), Some(pl), Some(cs), Some(cl)) => crossover((ps, pl), (cs, cl)),
            _ => Signal::Hold,
        }
    }
}

impl Strategy for MovingAverageCrossover {
    fn name(&self) -> &str {
        "Moving Average Crossover"
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("short_window", self.short_window.to_string()),
            ("long_window", self.long_window.to_string()),
        ]
    }

    fn generate_signals(&mut self, history: &[SymbolHistory<'_>]) -> SignalMap {
        signal_each(history, |h| self.signal_for(&h.closes()))
    }
}
