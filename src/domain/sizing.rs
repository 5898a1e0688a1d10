//! Position sizing: how many shares a BUY or SELL signal trades.

use super::portfolio::Portfolio;
use super::strategy::Signal;
use super::trade::Side;

/// Turns a signal into a share count. Zero means "nothing to trade".
pub trait PositionSizer: Send + Sync {
    fn size(&self, signal: Signal, symbol: &str, price: f64, portfolio: &Portfolio) -> f64;
}

/// BUY spends a fraction of available cash, leaving room for the trading cost;
/// SELL liquidates the whole position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionOfCash {
    pub fraction: f64,
    pub whole_shares: bool,
}

impl Default for FractionOfCash {
    fn default() -> Self {
        FractionOfCash {
            fraction: 0.95,
            whole_shares: true,
        }
    }
}

impl PositionSizer for FractionOfCash {
    fn size(&self, signal: Signal, symbol: &str, price: f64, portfolio: &Portfolio) -> f64 {
        match signal {
            Signal::Hold => 0.0,
            Signal::Sell => portfolio.shares_held(symbol),
            Signal::Buy => {
                if !price.is_finite() || price <= 0.0 {
                    return 0.0;
                }
                let budget = portfolio.cash() * self.fraction;
                let value = portfolio.cost_model().affordable_value(budget, Side::Buy);
                let shares = (value / price).max(0.0);
                let shares = if self.whole_shares { shares.floor() } else { shares };
                self.fit_to_cash(shares, price, portfolio)
            }
        }
    }
}

impl FractionOfCash {
    /// Shrinks `shares` until value plus buy cost fits in cash, computed the
    /// same way `Portfolio::buy` checks it. Rounding in `affordable_value`
    /// can overshoot the cash by a few ulps.
    fn fit_to_cash(&self, mut shares: f64, price: f64, portfolio: &Portfolio) -> f64 {
        let cash = portfolio.cash();
        let cost_model = portfolio.cost_model();
        let fits = |shares: f64| {
            let gross = shares * price;
            gross + cost_model.cost(gross, Side::Buy) <= cash
        };
        while shares > 0.0 && !fits(shares) {
            shares = if self.whole_shares {
                shares - 1.0
            } else {
                shares * (1.0 - 4.0 * f64::EPSILON)
            };
        }
        shares.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost::{CostConfig, CostModel};
    use crate::domain::tax::TaxModel;
    use chrono::NaiveDate;

    fn portfolio(cost: CostModel) -> Portfolio {
        Portfolio::new(10_000.0, cost, TaxModel::untaxed())
    }

    #[test]
    fn buy_whole_shares_without_costs() {
        let sizer = FractionOfCash::default();
        let p = portfolio(CostModel::free());
        // 9500 / 30 = 316.67
        assert_eq!(sizer.size(Signal::Buy, "AAPL", 30.0, &p), 316.0);
    }

    #[test]
    fn buy_leaves_room_for_fixed_cost() {
        let sizer = FractionOfCash {
            fraction: 1.0,
            whole_shares: true,
        };
        let p = portfolio(CostModel::new(CostConfig::fixed(10.0)).unwrap());
        // 10000 - 10 = 9990 -> 99 shares at 100
        assert_eq!(sizer.size(Signal::Buy, "AAPL", 100.0, &p), 99.0);
    }

    #[test]
    fn buy_leaves_room_for_percentage_cost() {
        let sizer = FractionOfCash {
            fraction: 1.0,
            whole_shares: true,
        };
        let p = portfolio(CostModel::new(CostConfig::percentage(0.01)).unwrap());
        // 10000 / 1.01 = 9900.99 -> 99 shares at 100
        assert_eq!(sizer.size(Signal::Buy, "AAPL", 100.0, &p), 99.0);
    }

    #[test]
    fn sized_buy_is_affordable() {
        let sizer = FractionOfCash {
            fraction: 1.0,
            whole_shares: false,
        };
        let mut p = portfolio(CostModel::new(CostConfig::percentage(0.002)).unwrap());
        let shares = sizer.size(Signal::Buy, "AAPL", 37.0, &p);
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(shares > 0.0);
        assert!(p.buy("AAPL", shares, 37.0, date).is_ok());
    }

    #[test]
    fn full_cash_fractional_buy_always_fits() {
        let sizer = FractionOfCash {
            fraction: 1.0,
            whole_shares: false,
        };
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        for pct in [0.001, 0.002, 0.005] {
            for cents in 100..2100 {
                let price = cents as f64 / 100.0;
                let mut p = portfolio(CostModel::new(CostConfig::percentage(pct)).unwrap());
                let shares = sizer.size(Signal::Buy, "X", price, &p);
                assert!(shares > 0.0);
                let result = p.buy("X", shares, price, date);
                assert!(result.is_ok(), "price {price} pct {pct}: {result:?}");
                // nothing meaningful left on the table
                assert!(p.cash() < 1e-6, "price {price} pct {pct}: cash {}", p.cash());
            }
        }
    }

    #[test]
    fn full_cash_fractional_buy_fits_fixed_cost() {
        let sizer = FractionOfCash {
            fraction: 1.0,
            whole_shares: false,
        };
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        for cents in 100..2100 {
            let price = cents as f64 / 100.0 + 0.003;
            let mut p = portfolio(CostModel::new(CostConfig::fixed(9.99)).unwrap());
            let shares = sizer.size(Signal::Buy, "X", price, &p);
            assert!(p.buy("X", shares, price, date).is_ok(), "price {price}");
        }
    }

    #[test]
    fn price_above_budget_sizes_zero() {
        let sizer = FractionOfCash::default();
        let p = portfolio(CostModel::free());
        assert_eq!(sizer.size(Signal::Buy, "BRK", 20_000.0, &p), 0.0);
    }

    #[test]
    fn sell_is_full_position() {
        let sizer = FractionOfCash::default();
        let mut p = portfolio(CostModel::free());
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        p.buy("AAPL", 12.0, 50.0, date).unwrap();
        assert_eq!(sizer.size(Signal::Sell, "AAPL", 60.0, &p), 12.0);
        assert_eq!(sizer.size(Signal::Sell, "MSFT", 60.0, &p), 0.0);
    }

    #[test]
    fn hold_is_zero() {
        let sizer = FractionOfCash::default();
        let p = portfolio(CostModel::free());
        assert_eq!(sizer.size(Signal::Hold, "AAPL", 10.0, &p), 0.0);
    }
}
