//! Portfolio accounting: cash, positions, costs, taxes, trade ledger and
//! equity curve.
//!
//! Every mutating call validates first and only then commits, so a rejected
//! trade leaves the portfolio exactly as it was.

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use super::cost::CostModel;
use super::error::NetreturnError;
use super::position::Position;
use super::tax::TaxModel;
use super::trade::{Side, TradeRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
}

/// How a held symbol without a price this period is valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// The position contributes nothing for the period.
    #[default]
    Zero,
    /// The last observed price is reused.
    CarryForward,
}

impl FromStr for GapPolicy {
    type Err = NetreturnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zero" => Ok(GapPolicy::Zero),
            "carry_forward" => Ok(GapPolicy::CarryForward),
            other => Err(NetreturnError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "gap_policy".to_string(),
                reason: format!("unknown gap_policy '{other}', expected zero or carry_forward"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    initial_capital: f64,
    cash: f64,
    positions: BTreeMap<String, Position>,
    history: Vec<TradeRecord>,
    equity_curve: Vec<EquityPoint>,
    total_trading_costs_paid: f64,
    total_taxes_paid: f64,
    total_taxes_deferred: f64,
    cost_model: CostModel,
    tax_model: TaxModel,
    gap_policy: GapPolicy,
    last_prices: BTreeMap<String, f64>,
}

impl Portfolio {
    pub fn new(initial_capital: f64, cost_model: CostModel, tax_model: TaxModel) -> Self {
        Portfolio {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            history: Vec::new(),
            equity_curve: Vec::new(),
            total_trading_costs_paid: 0.0,
            total_taxes_paid: 0.0,
            total_taxes_deferred: 0.0,
            cost_model,
            tax_model,
            gap_policy: GapPolicy::default(),
            last_prices: BTreeMap::new(),
        }
    }

    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn shares_held(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, Position::shares)
    }

    pub fn history(&self) -> &[TradeRecord] {
        &self.history
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn total_trading_costs_paid(&self) -> f64 {
        self.total_trading_costs_paid
    }

    pub fn total_taxes_paid(&self) -> f64 {
        self.total_taxes_paid
    }

    pub fn total_taxes_deferred(&self) -> f64 {
        self.total_taxes_deferred
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    pub fn tax_model(&self) -> &TaxModel {
        &self.tax_model
    }

    /// Buy `shares` of `symbol` at `price`, paying the trade value plus cost.
    pub fn buy(
        &mut self,
        symbol: &str,
        shares: f64,
        price: f64,
        timestamp: NaiveDate,
    ) -> Result<&TradeRecord, NetreturnError> {
        check_order(symbol, shares, price)?;

        let gross_value = shares * price;
        let trading_cost = self.cost_model.cost(gross_value, Side::Buy);
        let required = gross_value + trading_cost;

        if self.cash < required {
            return Err(NetreturnError::InsufficientFunds {
                symbol: symbol.to_string(),
                required,
                available: self.cash,
            });
        }

        self.cash -= required;
        self.positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::new(symbol))
            .buy(shares, price);
        self.total_trading_costs_paid += trading_cost;

        info!(
            "{timestamp} BUY {shares} {symbol} @ {price:.2} (cost {trading_cost:.2}, cash {:.2})",
            self.cash
        );

        Ok(self.append(TradeRecord {
            timestamp,
            symbol: symbol.to_string(),
            side: Side::Buy,
            shares,
            price,
            gross_value,
            trading_cost,
            tax_paid: 0.0,
            tax_deferred: 0.0,
            realized_gain: 0.0,
            cash_after: self.cash,
        }))
    }

    /// Sell `shares` of `symbol` at `price`. Trading cost and tax on the gross
    /// realized gain both come out of the sale proceeds.
    pub fn sell(
        &mut self,
        symbol: &str,
        shares: f64,
        price: f64,
        timestamp: NaiveDate,
    ) -> Result<&TradeRecord, NetreturnError> {
        check_order(symbol, shares, price)?;

        let position = self.positions.get_mut(symbol).ok_or_else(|| {
            NetreturnError::InsufficientPosition {
                symbol: symbol.to_string(),
                requested: shares,
                held: 0.0,
            }
        })?;
        let realized_gain = position.sell(shares, price)?;

        let gross_value = shares * price;
        let trading_cost = self.cost_model.cost(gross_value, Side::Sell);
        let tax = self.tax_model.tax(realized_gain);
        let (tax_paid, tax_deferred) = if self.tax_model.applies_immediately() {
            (tax, 0.0)
        } else {
            (0.0, tax)
        };

        self.cash += gross_value - trading_cost - tax_paid;
        self.total_trading_costs_paid += trading_cost;
        self.total_taxes_paid += tax_paid;
        self.total_taxes_deferred += tax_deferred;

        info!(
            "{timestamp} SELL {shares} {symbol} @ {price:.2} (gain {realized_gain:.2}, cost {trading_cost:.2}, tax {tax_paid:.2}, cash {:.2})",
            self.cash
        );

        Ok(self.append(TradeRecord {
            timestamp,
            symbol: symbol.to_string(),
            side: Side::Sell,
            shares,
            price,
            gross_value,
            trading_cost,
            tax_paid,
            tax_deferred,
            realized_gain,
            cash_after: self.cash,
        }))
    }

    fn append(&mut self, record: TradeRecord) -> &TradeRecord {
        self.history.push(record);
        &self.history[self.history.len() - 1]
    }

    /// Cash plus the value of every holding at `prices`, without recording
    /// anything. Held symbols missing from `prices` are valued per the gap
    /// policy.
    pub fn value_at(&self, prices: &HashMap<String, f64>) -> f64 {
        let holdings: f64 = self
            .positions
            .values()
            .filter(|pos| !pos.is_empty())
            .map(|pos| match self.price_for(pos.symbol(), prices) {
                Some(price) => pos.market_value(price),
                None => 0.0,
            })
            .sum();
        self.cash + holdings
    }

    fn price_for(&self, symbol: &str, prices: &HashMap<String, f64>) -> Option<f64> {
        match prices.get(symbol) {
            Some(&price) => Some(price),
            None => match self.gap_policy {
                GapPolicy::Zero => None,
                GapPolicy::CarryForward => self.last_prices.get(symbol).copied(),
            },
        }
    }

    /// Revalue holdings at this period's prices and append to the equity curve.
    /// Cash and positions are not touched.
    pub fn mark_to_market(&mut self, prices: &HashMap<String, f64>, timestamp: NaiveDate) -> f64 {
        for pos in self.positions.values().filter(|pos| !pos.is_empty()) {
            if !prices.contains_key(pos.symbol()) {
                let gap = NetreturnError::DataGap {
                    symbol: pos.symbol().to_string(),
                    date: timestamp,
                };
                warn!("{gap}, valuing with {:?} policy", self.gap_policy);
            }
        }

        let equity = self.value_at(prices);

        for (symbol, &price) in prices {
            self.last_prices.insert(symbol.clone(), price);
        }

        debug!("{timestamp} equity {equity:.2} (cash {:.2})", self.cash);
        self.equity_curve.push(EquityPoint {
            date: timestamp,
            equity,
            cash: self.cash,
        });
        equity
    }

    /// Most recent marked value.
    pub fn total_value(&self) -> Result<f64, NetreturnError> {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .ok_or(NetreturnError::NoValuation)
    }
}

fn check_order(symbol: &str, shares: f64, price: f64) -> Result<(), NetreturnError> {
    if !shares.is_finite() || shares <= 0.0 {
        return Err(NetreturnError::InvalidOrder {
            symbol: symbol.to_string(),
            reason: format!("share count must be positive, got {shares}"),
        });
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(NetreturnError::InvalidOrder {
            symbol: symbol.to_string(),
            reason: format!("price must be positive, got {price}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost::CostConfig;
    use crate::domain::tax::TaxConfig;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn fixed_cost_portfolio() -> Portfolio {
        Portfolio::new(
            10_000.0,
            CostModel::new(CostConfig::fixed(10.0)).unwrap(),
            TaxModel::new(TaxConfig::flat(0.25)).unwrap(),
        )
    }

    fn prices(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn new_portfolio() {
        let portfolio = fixed_cost_portfolio();
        assert_eq!(portfolio.cash(), 10_000.0);
        assert_eq!(portfolio.initial_capital(), 10_000.0);
        assert!(portfolio.positions().is_empty());
        assert!(portfolio.history().is_empty());
        assert!(portfolio.equity_curve().is_empty());
    }

    #[test]
    fn buy_then_sell_round_trip() {
        let mut portfolio = fixed_cost_portfolio();

        let buy = portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap().clone();
        assert_eq!(buy.gross_value, 1000.0);
        assert_eq!(buy.trading_cost, 10.0);
        assert_eq!(buy.cash_after, 8990.0);
        assert_eq!(portfolio.position("AAPL").unwrap().cost_basis_per_share(), 100.0);

        let sell = portfolio.sell("AAPL", 10.0, 150.0, date(3)).unwrap().clone();
        assert_eq!(sell.realized_gain, 500.0);
        assert_eq!(sell.trading_cost, 10.0);
        assert_eq!(sell.tax_paid, 125.0);
        assert_eq!(portfolio.cash(), 10_355.0);
        assert_eq!(portfolio.total_trading_costs_paid(), 20.0);
        assert_eq!(portfolio.total_taxes_paid(), 125.0);
        assert_eq!(portfolio.history().len(), 2);
    }

    #[test]
    fn emptied_position_stays_in_map() {
        let mut portfolio = fixed_cost_portfolio();
        portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap();
        portfolio.sell("AAPL", 10.0, 90.0, date(3)).unwrap();
        let pos = portfolio.position("AAPL").unwrap();
        assert!(pos.is_empty());
        assert_eq!(portfolio.shares_held("AAPL"), 0.0);
    }

    #[test]
    fn insufficient_funds_leaves_state_unchanged() {
        let mut portfolio = fixed_cost_portfolio();
        let before = portfolio.clone();
        // 100 * 100 + 10 > 10000
        let err = portfolio.buy("AAPL", 100.0, 100.0, date(2)).unwrap_err();
        assert!(matches!(
            err,
            NetreturnError::InsufficientFunds { required, .. } if required == 10_010.0
        ));
        assert_eq!(portfolio, before);
    }

    #[test]
    fn exact_cash_is_enough() {
        let mut portfolio = fixed_cost_portfolio();
        portfolio.buy("AAPL", 999.0, 10.0, date(2)).unwrap();
        assert_eq!(portfolio.cash(), 0.0);
    }

    #[test]
    fn sell_unknown_symbol_is_insufficient_position() {
        let mut portfolio = fixed_cost_portfolio();
        let before = portfolio.clone();
        let err = portfolio.sell("MSFT", 1.0, 50.0, date(2)).unwrap_err();
        assert!(matches!(err, NetreturnError::InsufficientPosition { held, .. } if held == 0.0));
        assert_eq!(portfolio, before);
    }

    #[test]
    fn oversell_leaves_state_unchanged() {
        let mut portfolio = fixed_cost_portfolio();
        portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap();
        let before = portfolio.clone();
        let err = portfolio.sell("AAPL", 11.0, 150.0, date(3)).unwrap_err();
        assert!(matches!(err, NetreturnError::InsufficientPosition { .. }));
        assert_eq!(portfolio, before);
    }

    #[test]
    fn invalid_orders_rejected() {
        let mut portfolio = fixed_cost_portfolio();
        let before = portfolio.clone();
        assert!(matches!(
            portfolio.buy("AAPL", 0.0, 100.0, date(2)),
            Err(NetreturnError::InvalidOrder { .. })
        ));
        assert!(matches!(
            portfolio.buy("AAPL", 1.0, f64::NAN, date(2)),
            Err(NetreturnError::InvalidOrder { .. })
        ));
        assert!(matches!(
            portfolio.sell("AAPL", -1.0, 100.0, date(2)),
            Err(NetreturnError::InvalidOrder { .. })
        ));
        assert_eq!(portfolio, before);
    }

    #[test]
    fn loss_is_not_taxed_but_still_costs() {
        let mut portfolio = fixed_cost_portfolio();
        portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap();
        let sell = portfolio.sell("AAPL", 10.0, 80.0, date(3)).unwrap().clone();
        assert_eq!(sell.realized_gain, -200.0);
        assert_eq!(sell.tax_paid, 0.0);
        assert_eq!(sell.trading_cost, 10.0);
        assert_eq!(portfolio.cash(), 8990.0 + 800.0 - 10.0);
    }

    #[test]
    fn deferred_tax_not_deducted() {
        let mut portfolio = Portfolio::new(
            10_000.0,
            CostModel::new(CostConfig::fixed(10.0)).unwrap(),
            TaxModel::new(TaxConfig {
                apply_immediately: false,
                ..TaxConfig::flat(0.25)
            })
            .unwrap(),
        );
        portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap();
        let sell = portfolio.sell("AAPL", 10.0, 150.0, date(3)).unwrap().clone();
        assert_eq!(sell.tax_paid, 0.0);
        assert_eq!(sell.tax_deferred, 125.0);
        assert_eq!(portfolio.cash(), 10_480.0);
        assert_eq!(portfolio.total_taxes_paid(), 0.0);
        assert_eq!(portfolio.total_taxes_deferred(), 125.0);
    }

    #[test]
    fn mark_to_market_values_holdings() {
        let mut portfolio = fixed_cost_portfolio();
        portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap();
        let cash = portfolio.cash();
        let positions = portfolio.positions().clone();

        let value = portfolio.mark_to_market(&prices(&[("AAPL", 120.0)]), date(2));
        assert_eq!(value, 8990.0 + 1200.0);
        assert_eq!(portfolio.total_value().unwrap(), value);
        assert_eq!(portfolio.cash(), cash);
        assert_eq!(portfolio.positions(), &positions);
        assert_eq!(portfolio.equity_curve()[0].cash, cash);
    }

    #[test]
    fn missing_price_contributes_zero_by_default() {
        let mut portfolio = fixed_cost_portfolio();
        portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap();
        portfolio.mark_to_market(&prices(&[("AAPL", 100.0)]), date(2));
        let value = portfolio.mark_to_market(&prices(&[("MSFT", 50.0)]), date(3));
        assert_eq!(value, 8990.0);
    }

    #[test]
    fn carry_forward_reuses_last_price() {
        let mut portfolio = fixed_cost_portfolio().with_gap_policy(GapPolicy::CarryForward);
        portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap();
        portfolio.mark_to_market(&prices(&[("AAPL", 110.0)]), date(2));
        let value = portfolio.mark_to_market(&HashMap::new(), date(3));
        assert_eq!(value, 8990.0 + 1100.0);
    }

    #[test]
    fn carry_forward_without_history_is_zero() {
        let mut portfolio = fixed_cost_portfolio().with_gap_policy(GapPolicy::CarryForward);
        portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap();
        let value = portfolio.mark_to_market(&HashMap::new(), date(2));
        assert_eq!(value, 8990.0);
    }

    #[test]
    fn total_value_before_mark_fails() {
        let portfolio = fixed_cost_portfolio();
        assert_eq!(portfolio.total_value(), Err(NetreturnError::NoValuation));
    }

    #[test]
    fn total_value_is_latest_mark() {
        let mut portfolio = fixed_cost_portfolio();
        portfolio.buy("AAPL", 10.0, 100.0, date(2)).unwrap();
        portfolio.mark_to_market(&prices(&[("AAPL", 101.0)]), date(2));
        assert!((portfolio.total_value().unwrap() - 10_000.0).abs() < 1e-12);
    }

    #[test]
    fn gap_policy_parses() {
        assert_eq!("zero".parse::<GapPolicy>().unwrap(), GapPolicy::Zero);
        assert_eq!(
            "carry_forward".parse::<GapPolicy>().unwrap(),
            GapPolicy::CarryForward
        );
        assert!("interpolate".parse::<GapPolicy>().is_err());
    }
}
