//! Backtest engine and event loop.
//!
//! For each timestamp, in ascending order: mark the portfolio to market at the
//! period's closes, ask the strategy for signals, size each actionable signal
//! and execute it at the close. Trades the portfolio rejects are recorded as
//! skips and the run carries on.

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

use super::cost::{CostConfig, CostModel};
use super::error::NetreturnError;
use super::portfolio::{GapPolicy, Portfolio};
use super::sizing::{FractionOfCash, PositionSizer};
use super::strategy::{Signal, Strategy, SymbolHistory};
use super::symbol_data::{SymbolData, build_unified_timeline};
use super::tax::{TaxConfig, TaxModel};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub cost: CostConfig,
    pub tax: TaxConfig,
    pub gap_policy: GapPolicy,
    pub position_fraction: f64,
    pub whole_shares: bool,
    pub allow_pyramiding: bool,
    pub risk_free_rate: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            cost: CostConfig::default(),
            tax: TaxConfig::default(),
            gap_policy: GapPolicy::default(),
            position_fraction: 0.95,
            whole_shares: true,
            allow_pyramiding: false,
            risk_free_rate: 0.02,
            start_date: None,
            end_date: None,
        }
    }
}

/// A signal that did not turn into a trade.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTrade {
    pub date: NaiveDate,
    pub symbol: String,
    pub signal: Signal,
    pub shares: f64,
    pub price: f64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub parameters: Vec<(&'static str, String)>,
    pub portfolio: Portfolio,
    pub skipped: Vec<SkippedTrade>,
    /// Cash plus holdings at each symbol's last close, after the final
    /// period's trades.
    pub final_value: f64,
    /// Last close seen for each symbol.
    pub final_prices: BTreeMap<String, f64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BacktestResult {
    pub fn total_return(&self) -> f64 {
        let initial = self.portfolio.initial_capital();
        if initial > 0.0 {
            (self.final_value - initial) / initial
        } else {
            0.0
        }
    }

    /// Paper gain of every open position at its last close. Symbols without
    /// a final price count as zero.
    pub fn unrealized_gain(&self) -> f64 {
        self.portfolio
            .positions()
            .values()
            .filter(|pos| !pos.is_empty())
            .filter_map(|pos| {
                self.final_prices
                    .get(pos.symbol())
                    .map(|&price| pos.unrealized_gain(price))
            })
            .sum()
    }
}

pub struct BacktestEngine {
    config: BacktestConfig,
    cost_model: CostModel,
    tax_model: TaxModel,
    sizer: Box<dyn PositionSizer>,
}

impl BacktestEngine {
    /// Validates the cost and tax configuration and sets up the default
    /// fraction-of-cash sizer.
    pub fn new(config: BacktestConfig) -> Result<Self, NetreturnError> {
        if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
            return Err(NetreturnError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "initial_capital".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(config.position_fraction > 0.0 && config.position_fraction <= 1.0) {
            return Err(NetreturnError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "position_fraction".to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }
        let cost_model = CostModel::new(config.cost.clone())?;
        let tax_model = TaxModel::new(config.tax.clone())?;
        let sizer = Box::new(FractionOfCash {
            fraction: config.position_fraction,
            whole_shares: config.whole_shares,
        });
        Ok(BacktestEngine {
            config,
            cost_model,
            tax_model,
            sizer,
        })
    }

    pub fn with_sizer(mut self, sizer: Box<dyn PositionSizer>) -> Self {
        self.sizer = sizer;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn run(
        &self,
        data: &[SymbolData],
        strategy: &mut dyn Strategy,
    ) -> Result<BacktestResult, NetreturnError> {
        let filtered: Vec<SymbolData> = data
            .iter()
            .map(|sd| sd.within(self.config.start_date, self.config.end_date))
            .filter(|sd| sd.bar_count() > 0)
            .collect();
        let timeline = build_unified_timeline(&filtered);
        let (Some(&start_date), Some(&end_date)) = (timeline.first(), timeline.last()) else {
            let symbols: Vec<&str> = data.iter().map(|sd| sd.symbol.as_str()).collect();
            return Err(NetreturnError::NoData {
                symbol: symbols.join(","),
            });
        };

        info!(
            "Running {} over {} symbols, {} periods ({start_date} to {end_date})",
            strategy.name(),
            filtered.len(),
            timeline.len()
        );

        let mut portfolio = Portfolio::new(
            self.config.initial_capital,
            self.cost_model.clone(),
            self.tax_model.clone(),
        )
        .with_gap_policy(self.config.gap_policy);
        let mut skipped = Vec::new();

        for &date in &timeline {
            let mut prices: HashMap<String, f64> = HashMap::new();
            let mut history = Vec::with_capacity(filtered.len());
            for sd in &filtered {
                if let Some(bar) = sd.get_bar(date) {
                    prices.insert(sd.symbol.clone(), bar.close);
                    history.push(SymbolHistory {
                        symbol: &sd.symbol,
                        bars: sd.history_until(date),
                    });
                }
            }

            portfolio.mark_to_market(&prices, date);

            let signals = strategy.generate_signals(&history);
            for (symbol, signal) in signals {
                if signal == Signal::Hold {
                    continue;
                }
                if let Some(skip) = self.act(&mut portfolio, date, &symbol, signal, &prices)? {
                    warn!("{date} skipped {signal} {symbol}: {}", skip.reason);
                    skipped.push(skip);
                }
            }
        }

        let last_closes: HashMap<String, f64> = filtered
            .iter()
            .filter_map(|sd| sd.bars.last().map(|b| (sd.symbol.clone(), b.close)))
            .collect();
        let final_value = portfolio.value_at(&last_closes);
        let final_prices: BTreeMap<String, f64> = last_closes.into_iter().collect();

        info!(
            "{} finished: final value {final_value:.2}, {} trades, {} skipped",
            strategy.name(),
            portfolio.history().len(),
            skipped.len()
        );

        Ok(BacktestResult {
            strategy_name: strategy.name().to_string(),
            parameters: strategy.parameters(),
            portfolio,
            skipped,
            final_value,
            final_prices,
            start_date,
            end_date,
        })
    }

    /// Executes one signal. Returns the skip annotation when the signal could
    /// not be traded; fails only on errors that are not trade rejections.
    fn act(
        &self,
        portfolio: &mut Portfolio,
        date: NaiveDate,
        symbol: &str,
        signal: Signal,
        prices: &HashMap<String, f64>,
    ) -> Result<Option<SkippedTrade>, NetreturnError> {
        let held = portfolio.shares_held(symbol);
        let skip = |shares: f64, price: f64, reason: String| SkippedTrade {
            date,
            symbol: symbol.to_string(),
            signal,
            shares,
            price,
            reason,
        };

        let Some(&price) = prices.get(symbol) else {
            return Ok(Some(skip(0.0, 0.0, "no price for this period".to_string())));
        };

        match signal {
            Signal::Buy if held > 0.0 && !self.config.allow_pyramiding => {
                debug!("{date} BUY {symbol} ignored, already holding {held}");
                return Ok(None);
            }
            Signal::Sell if held <= 0.0 => {
                debug!("{date} SELL {symbol} ignored, nothing held");
                return Ok(None);
            }
            _ => {}
        }

        let shares = self.sizer.size(signal, symbol, price, portfolio);
        if shares <= 0.0 {
            return Ok(Some(skip(shares, price, "position sized to zero".to_string())));
        }

        let outcome = match signal {
            Signal::Buy => portfolio.buy(symbol, shares, price, date).map(|_| ()),
            Signal::Sell => portfolio.sell(symbol, shares, price, date).map(|_| ()),
            Signal::Hold => Ok(()),
        };

        match outcome {
            Ok(()) => Ok(None),
            Err(err) if err.is_trade_rejection() => Ok(Some(skip(shares, price, err.to_string()))),
            Err(err) => Err(err),
        }
    }
}

/// Runs `strategy` over `data` with a fresh engine built from `config`.
pub fn run_backtest(
    data: &[SymbolData],
    strategy: &mut dyn Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, NetreturnError> {
    BacktestEngine::new(config.clone())?.run(data, strategy)
}
