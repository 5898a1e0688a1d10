//! MACD crossover: buy when the MACD line crosses above its signal line,
//! sell when it crosses below.

use super::{crossover, invalid_param, signal_each};
use crate::domain::error::NetreturnError;
use crate::domain::indicator::macd;
use crate::domain::strategy::{Signal, SignalMap, Strategy, SymbolHistory};

#[derive(Debug, Clone)]
pub struct MacdCrossover {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl MacdCrossover {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, NetreturnError> {
        if fast == 0 {
            return Err(invalid_param("fast", "fast must be at least 1"));
        }
        if signal == 0 {
            return Err(invalid_param("signal", "signal must be at least 1"));
        }
        if fast >= slow {
            return Err(invalid_param("fast", "fast must be less than slow"));
        }
        Ok(Self { fast, slow, signal })
    }

    fn signal_for(&self, closes: &[f64]) -> Signal {
        let points = macd(closes, self.fast, self.slow, self.signal);
        let n = points.len();
        if n < 2 {
            return Signal::Hold;
        }
        match (points[n - 2], points[n - 1]) {
            (Some(prev), Some(curr)) => {
                crossover((prev.line, prev.signal), (curr.line, curr.signal))
            }
            _ => Signal::Hold,
        }
    }
}

impl Strategy for MacdCrossover {
    fn name(&self) -> &str {
        "MACD"
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("fast", self.fast.to_string()),
            ("slow", self.slow.to_string()),
            ("signal", self.signal.to_string()),
        ]
    }

    fn generate_signals(&mut self, history: &[SymbolHistory<'_>]) -> SignalMap {
        signal_each(history, |h| self.signal_for(&h.closes()))
    }
}
