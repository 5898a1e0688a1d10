//! Concrete strategies and the config-level description used to build them.

pub mod buy_and_hold;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use buy_and_hold::BuyAndHold;
pub use macd::MacdCrossover;
pub use moving_average::MovingAverageCrossover;
pub use rsi::RsiThreshold;

use crate::domain::error::NetreturnError;
use crate::domain::strategy::{Signal, SignalMap, Strategy, SymbolHistory};

#[derive(Debug, Clone, PartialEq)]
pub enum StrategySpec {
    BuyAndHold,
    MovingAverage {
        short_window: usize,
        long_window: usize,
    },
    Rsi {
        period: usize,
        oversold: f64,
        overbought: f64,
    },
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl StrategySpec {
    pub fn kind(&self) -> &'static str {
        match self {
            StrategySpec::BuyAndHold => "buy_and_hold",
            StrategySpec::MovingAverage { .. } => "moving_average",
            StrategySpec::Rsi { .. } => "rsi",
            StrategySpec::Macd { .. } => "macd",
        }
    }

    pub fn build(&self) -> Result<Box<dyn Strategy>, NetreturnError> {
        Ok(match *self {
            StrategySpec::BuyAndHold => Box::new(BuyAndHold::new()),
            StrategySpec::MovingAverage {
                short_window,
                long_window,
            } => Box::new(MovingAverageCrossover::new(short_window, long_window)?),
            StrategySpec::Rsi {
                period,
                oversold,
                overbought,
            } => Box::new(RsiThreshold::new(period, oversold, overbought)?),
            StrategySpec::Macd { fast, slow, signal } => {
                Box::new(MacdCrossover::new(fast, slow, signal)?)
            }
        })
    }

    /// Every strategy with its default parameters, for comparisons.
    pub fn defaults() -> Vec<StrategySpec> {
        vec![
            StrategySpec::BuyAndHold,
            StrategySpec::MovingAverage {
                short_window: 20,
                long_window: 50,
            },
            StrategySpec::Rsi {
                period: 14,
                oversold: 30.0,
                overbought: 70.0,
            },
            StrategySpec::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
        ]
    }
}

pub(crate) fn invalid_param(key: &str, reason: &str) -> NetreturnError {
    NetreturnError::ConfigInvalid {
        section: "strategy".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Applies a per-symbol rule to every symbol in `history`.
pub(crate) fn signal_each<F>(history: &[SymbolHistory<'_>], mut rule: F) -> SignalMap
where
    F: FnMut(&SymbolHistory<'_>) -> Signal,
{
    history
        .iter()
        .map(|h| (h.symbol.to_string(), rule(h)))
        .collect()
}

/// Classifies a move of `fast` relative to `slow` between two bars.
pub(crate) fn crossover(prev: (f64, f64), curr: (f64, f64)) -> Signal {
    let (prev_fast, prev_slow) = prev;
    let (curr_fast, curr_slow) = curr;
    if prev_fast <= prev_slow && curr_fast > curr_slow {
        Signal::Buy
    } else if prev_fast >= prev_slow && curr_fast < curr_slow {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                symbol: symbol.to_string(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }
}
