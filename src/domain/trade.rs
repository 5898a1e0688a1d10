//! Trade side and the immutable trade ledger entry.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// One executed trade. Appended to the portfolio history and never modified.
///
/// `tax_paid` and `realized_gain` are zero for buys. `tax_deferred` holds the
/// liability of a sell when the tax configuration defers payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub timestamp: NaiveDate,
    pub symbol: String,
    pub side: Side,
    pub shares: f64,
    pub price: f64,
    pub gross_value: f64,
    pub trading_cost: f64,
    pub tax_paid: f64,
    pub tax_deferred: f64,
    pub realized_gain: f64,
    pub cash_after: f64,
}

impl TradeRecord {
    /// Realized gain after the sell-side cost and any tax, paid or deferred.
    pub fn net_gain(&self) -> f64 {
        match self.side {
            Side::Buy => 0.0,
            Side::Sell => {
                self.realized_gain - self.trading_cost - self.tax_paid - self.tax_deferred
            }
        }
    }
}
