//! Per-symbol holding with weighted-average cost basis.

use super::error::NetreturnError;

/// Shares held in one symbol and their average purchase price.
///
/// The basis is carried as a running `(total_cost, shares)` pair so a long
/// series of small buys sums raw trade values instead of re-averaging an
/// already rounded price each time. Sells reduce shares only; the basis stays
/// put until the position is fully closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    symbol: String,
    shares: f64,
    total_cost: f64,
    cost_basis_per_share: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>) -> Self {
        Position {
            symbol: symbol.into(),
            shares: 0.0,
            total_cost: 0.0,
            cost_basis_per_share: 0.0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn shares(&self) -> f64 {
        self.shares
    }

    /// Weighted-average price paid. Meaningless while the position is empty.
    pub fn cost_basis_per_share(&self) -> f64 {
        self.cost_basis_per_share
    }

    pub fn is_empty(&self) -> bool {
        self.shares == 0.0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    pub fn unrealized_gain(&self, price: f64) -> f64 {
        self.shares * (price - self.cost_basis_per_share)
    }

    /// Gain a sale of `shares` at `price` would realize, without selling.
    pub fn gain_on(&self, shares: f64, price: f64) -> f64 {
        shares * (price - self.cost_basis_per_share)
    }

    pub fn buy(&mut self, shares: f64, price: f64) {
        self.total_cost += shares * price;
        self.shares += shares;
        self.cost_basis_per_share = self.total_cost / self.shares;
    }

    /// Remove `shares` at `price` and return the realized gain. Fails without
    /// touching the position when more shares are requested than held.
    pub fn sell(&mut self, shares: f64, price: f64) -> Result<f64, NetreturnError> {
        if shares > self.shares {
            return Err(NetreturnError::InsufficientPosition {
                symbol: self.symbol.clone(),
                requested: shares,
                held: self.shares,
            });
        }

        let realized_gain = self.gain_on(shares, price);
        self.shares -= shares;

        if self.shares == 0.0 {
            self.total_cost = 0.0;
            self.cost_basis_per_share = 0.0;
        } else {
            self.total_cost = self.cost_basis_per_share * self.shares;
        }

        Ok(realized_gain)
    }
}
