//! RSI thresholds: buy when oversold, sell when overbought.

use super::{invalid_param, signal_each};
use crate::domain::error::NetreturnError;
use crate::domain::indicator::rsi;
use crate::domain::strategy::{Signal, SignalMap, Strategy, SymbolHistory};

#[derive(Debug, Clone)]
pub struct RsiThreshold {
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl RsiThreshold {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Result<Self, NetreturnError> {
        if period == 0 {
            return Err(invalid_param("period", "period must be at least 1"));
        }
        if !(0.0..=100.0).contains(&oversold) {
            return Err(invalid_param("oversold", "must be between 0 and 100"));
        }
        if !(0.0..=100.0).contains(&overbought) {
            return Err(invalid_param("overbought", "must be between 0 and 100"));
        }
        if oversold >= overbought {
            return Err(invalid_param(
                "oversold",
                "oversold must be less than overbought",
            ));
        }
        Ok(Self {
            period,
            oversold,
            overbought,
        })
    }

    fn signal_for(&self, closes: &[f64]) -> Signal {
        if closes.len() <= self.period {
            return Signal::Hold;
        }
        // Only the last value matters; the window is period changes.
        let tail = &closes[closes.len() - self.period - 1..];
        match rsi(tail, self.period).last().copied().flatten() {
            Some(value) if value < self.oversold => Signal::Buy,
            Some(value) if value > self.overbought => Signal::Sell,
            _ => Signal::Hold,
        }
    }
}

impl Strategy for RsiThreshold {
    fn name(&self) -> &str {
        "RSI"
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("period", self.period.to_string()),
            ("oversold", self.oversold.to_string()),
            ("overbought", self.overbought.to_string()),
        ]
    }

    fn generate_signals(&mut self, history: &[SymbolHistory<'_>]) -> SignalMap {
        signal_each(history, |h| self.signal_for(&h.closes()))
    }
}
