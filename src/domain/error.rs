//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for netreturn.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetreturnError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("insufficient funds to buy {symbol}: need {required:.2}, have {available:.2}")]
    InsufficientFunds {
        symbol: String,
        required: f64,
        available: f64,
    },

    #[error("insufficient position in {symbol}: requested {requested}, held {held}")]
    InsufficientPosition {
        symbol: String,
        requested: f64,
        held: f64,
    },

    #[error("invalid order for {symbol}: {reason}")]
    InvalidOrder { symbol: String, reason: String },

    #[error("no price for {symbol} on {date}")]
    DataGap { symbol: String, date: NaiveDate },

    #[error("portfolio has not been marked to market yet")]
    NoValuation,

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("bad data in {source_name}: {reason}")]
    DataFormat { source_name: String, reason: String },

    #[error("io error: {reason}")]
    Io { reason: String },
}

impl NetreturnError {
    /// True for per-trade rejections the backtest loop records and moves past.
    pub fn is_trade_rejection(&self) -> bool {
        matches!(
            self,
            NetreturnError::InsufficientFunds { .. }
                | NetreturnError::InsufficientPosition { .. }
                | NetreturnError::InvalidOrder { .. }
        )
    }
}

impl From<std::io::Error> for NetreturnError {
    fn from(err: std::io::Error) -> Self {
        NetreturnError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<&NetreturnError> for std::process::ExitCode {
    fn from(err: &NetreturnError) -> Self {
        let code: u8 = match err {
            NetreturnError::Io { .. } => 1,
            NetreturnError::ConfigParse { .. }
            | NetreturnError::ConfigMissing { .. }
            | NetreturnError::ConfigInvalid { .. } => 2,
            NetreturnError::DataFormat { .. } | NetreturnError::DataGap { .. } => 3,
            NetreturnError::InsufficientFunds { .. }
            | NetreturnError::InsufficientPosition { .. }
            | NetreturnError::InvalidOrder { .. }
            | NetreturnError::NoValuation => 4,
            NetreturnError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
