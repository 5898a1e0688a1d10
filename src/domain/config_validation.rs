//! Configuration loading and validation.
//!
//! Every builder reads its section through [`ConfigPort`], fills defaults for
//! absent keys and rejects bad values with the offending section and key.

use crate::domain::backtest::BacktestConfig;
use crate::domain::cost::{CostConfig, CostType};
use crate::domain::error::NetreturnError;
use crate::domain::portfolio::GapPolicy;
use crate::domain::strategies::StrategySpec;
use crate::domain::tax::TaxConfig;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

/// Validates every section without keeping the results.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), NetreturnError> {
    build_backtest_config(config)?;
    build_strategy_spec(config)?;
    Ok(())
}

pub fn build_cost_config(config: &dyn ConfigPort) -> Result<CostConfig, NetreturnError> {
    let defaults = CostConfig::default();
    let cost_type = match config.get_string("trading_costs", "cost_type") {
        Some(s) => s.parse::<CostType>()?,
        None => defaults.cost_type,
    };
    let cost = CostConfig {
        cost_type,
        fixed_cost_per_trade: config.get_double(
            "trading_costs",
            "fixed_cost_per_trade",
            defaults.fixed_cost_per_trade,
        )?,
        percentage_cost_per_trade: config.get_double(
            "trading_costs",
            "percentage_cost_per_trade",
            defaults.percentage_cost_per_trade,
        )?,
        apply_to_buy: config.get_bool("trading_costs", "apply_to_buy", defaults.apply_to_buy)?,
        apply_to_sell: config.get_bool("trading_costs", "apply_to_sell", defaults.apply_to_sell)?,
        currency: config
            .get_string("trading_costs", "currency")
            .unwrap_or(defaults.currency),
    };
    cost.validate()?;
    Ok(cost)
}

pub fn build_tax_config(config: &dyn ConfigPort) -> Result<TaxConfig, NetreturnError> {
    let defaults = TaxConfig::default();
    let tax = TaxConfig {
        tax_rate: config.get_double("tax", "tax_rate", defaults.tax_rate)?,
        apply_immediately: config.get_bool(
            "tax",
            "apply_immediately",
            defaults.apply_immediately,
        )?,
        tax_free_threshold: config.get_double(
            "tax",
            "tax_free_threshold",
            defaults.tax_free_threshold,
        )?,
        currency: config
            .get_string("tax", "currency")
            .unwrap_or(defaults.currency),
    };
    tax.validate()?;
    Ok(tax)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, NetreturnError> {
    let defaults = BacktestConfig::default();

    let initial_capital =
        config.get_double("backtest", "initial_capital", defaults.initial_capital)?;
    if initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let position_fraction =
        config.get_double("backtest", "position_fraction", defaults.position_fraction)?;
    if position_fraction <= 0.0 || position_fraction > 1.0 {
        return Err(invalid(
            "backtest",
            "position_fraction",
            "position_fraction must be in (0, 1]",
        ));
    }

    let risk_free_rate = config.get_double("backtest", "risk_free_rate", defaults.risk_free_rate)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    let gap_policy = match config.get_string("backtest", "gap_policy") {
        Some(s) => s.parse::<GapPolicy>()?,
        None => defaults.gap_policy,
    };

    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start_date, end_date)
        && start > end
    {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }

    Ok(BacktestConfig {
        initial_capital,
        cost: build_cost_config(config)?,
        tax: build_tax_config(config)?,
        gap_policy,
        position_fraction,
        whole_shares: config.get_bool("backtest", "whole_shares", defaults.whole_shares)?,
        allow_pyramiding: config.get_bool(
            "backtest",
            "allow_pyramiding",
            defaults.allow_pyramiding,
        )?,
        risk_free_rate,
        start_date,
        end_date,
    })
}

/// Reads `[strategy]` into a `StrategySpec` and checks that it builds.
pub fn build_strategy_spec(config: &dyn ConfigPort) -> Result<StrategySpec, NetreturnError> {
    let kind = config
        .get_string("strategy", "kind")
        .unwrap_or_else(|| "buy_and_hold".to_string());

    let spec = match kind.to_lowercase().as_str() {
        "buy_and_hold" => StrategySpec::BuyAndHold,
        "moving_average" => StrategySpec::MovingAverage {
            short_window: get_window(config, "short_window", 20)?,
            long_window: get_window(config, "long_window", 50)?,
        },
        "rsi" => StrategySpec::Rsi {
            period: get_window(config, "period", 14)?,
            oversold: config.get_double("strategy", "oversold", 30.0)?,
            overbought: config.get_double("strategy", "overbought", 70.0)?,
        },
        "macd" => StrategySpec::Macd {
            fast: get_window(config, "fast", 12)?,
            slow: get_window(config, "slow", 26)?,
            signal: get_window(config, "signal", 9)?,
        },
        other => {
            return Err(invalid(
                "strategy",
                "kind",
                &format!(
                    "unknown kind '{other}', expected buy_and_hold, moving_average, rsi or macd"
                ),
            ));
        }
    };

    spec.build()?;
    Ok(spec)
}

fn get_window(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, NetreturnError> {
    let value = config.get_int("strategy", key, default as i64)?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| invalid("strategy", key, &format!("{key} must be at least 1")))
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, NetreturnError> {
    config
        .get_string("backtest", key)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
                invalid(
                    "backtest",
                    key,
                    &format!("invalid {key} format, expected YYYY-MM-DD"),
                )
            })
        })
        .transpose()
}

fn invalid(section: &str, key: &str, reason: &str) -> NetreturnError {
    NetreturnError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
