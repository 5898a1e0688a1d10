//! Trading cost model: fixed fee or percentage of trade value, per side.

use std::fmt;
use std::str::FromStr;

use super::error::NetreturnError;
use super::trade::Side;

const SECTION: &str = "trading_costs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostType {
    Fixed,
    Percentage,
}

impl FromStr for CostType {
    type Err = NetreturnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(CostType::Fixed),
            "percentage" => Ok(CostType::Percentage),
            other => Err(NetreturnError::ConfigInvalid {
                section: SECTION.to_string(),
                key: "cost_type".to_string(),
                reason: format!("unknown cost_type '{other}', expected fixed or percentage"),
            }),
        }
    }
}

impl fmt::Display for CostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostType::Fixed => write!(f, "fixed"),
            CostType::Percentage => write!(f, "percentage"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostConfig {
    pub cost_type: CostType,
    pub fixed_cost_per_trade: f64,
    /// Fraction of trade value, e.g. 0.002 for 0.2%.
    pub percentage_cost_per_trade: f64,
    pub apply_to_buy: bool,
    pub apply_to_sell: bool,
    pub currency: String,
}

impl Default for CostConfig {
    fn default() -> Self {
        CostConfig {
            cost_type: CostType::Percentage,
            fixed_cost_per_trade: 10.0,
            percentage_cost_per_trade: 0.002,
            apply_to_buy: true,
            apply_to_sell: true,
            currency: "EUR".to_string(),
        }
    }
}

impl CostConfig {
    pub fn fixed(amount: f64) -> Self {
        CostConfig {
            cost_type: CostType::Fixed,
            fixed_cost_per_trade: amount,
            ..Default::default()
        }
    }

    pub fn percentage(fraction: f64) -> Self {
        CostConfig {
            cost_type: CostType::Percentage,
            percentage_cost_per_trade: fraction,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), NetreturnError> {
        if !self.fixed_cost_per_trade.is_finite() || self.fixed_cost_per_trade < 0.0 {
            return Err(invalid(
                "fixed_cost_per_trade",
                "fixed_cost_per_trade must be non-negative",
            ));
        }
        let pct = self.percentage_cost_per_trade;
        if !pct.is_finite() || pct < 0.0 {
            return Err(invalid(
                "percentage_cost_per_trade",
                "percentage_cost_per_trade must be non-negative",
            ));
        }
        if self.cost_type == CostType::Percentage && (pct <= 0.0 || pct >= 1.0) {
            return Err(invalid(
                "percentage_cost_per_trade",
                "percentage_cost_per_trade must be between 0 and 1 (exclusive)",
            ));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> NetreturnError {
    NetreturnError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Validated, immutable cost model. Construct with [`CostModel::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    config: CostConfig,
}

impl CostModel {
    pub fn new(config: CostConfig) -> Result<Self, NetreturnError> {
        config.validate()?;
        Ok(CostModel { config })
    }

    /// A model that never charges.
    pub fn free() -> Self {
        CostModel {
            config: CostConfig {
                cost_type: CostType::Fixed,
                fixed_cost_per_trade: 0.0,
                ..Default::default()
            },
        }
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    fn applies_to(&self, side: Side) -> bool {
        match side {
            Side::Buy => self.config.apply_to_buy,
            Side::Sell => self.config.apply_to_sell,
        }
    }

    /// Cost of a trade of `trade_value` on `side`. A fixed fee does not scale
    /// with size, so a zero-value trade still costs the full fee.
    pub fn cost(&self, trade_value: f64, side: Side) -> f64 {
        if !self.applies_to(side) {
            return 0.0;
        }
        match self.config.cost_type {
            CostType::Fixed => self.config.fixed_cost_per_trade,
            CostType::Percentage => trade_value.max(0.0) * self.config.percentage_cost_per_trade,
        }
    }

    /// Largest gross trade value whose value plus cost fits within `budget`.
    pub fn affordable_value(&self, budget: f64, side: Side) -> f64 {
        if budget <= 0.0 {
            return 0.0;
        }
        if !self.applies_to(side) {
            return budget;
        }
        match self.config.cost_type {
            CostType::Fixed => (budget - self.config.fixed_cost_per_trade).max(0.0),
            CostType::Percentage => budget / (1.0 + self.config.percentage_cost_per_trade),
        }
    }
}
