//! Performance metrics over a finished backtest, net of costs and taxes.

use super::backtest::BacktestResult;
use super::portfolio::EquityPoint;
use super::trade::{Side, TradeRecord};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashMap;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    /// Annualized return over max drawdown.
    pub calmar_ratio: f64,
    /// Total return over max drawdown.
    pub recovery_factor: f64,
    /// Sample skewness of daily returns.
    pub skewness: f64,
    /// Sample excess kurtosis of daily returns.
    pub kurtosis: f64,
    pub num_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub total_trading_costs: f64,
    pub total_taxes_paid: f64,
    pub total_taxes_deferred: f64,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, risk_free_rate: f64) -> Self {
        let portfolio = &result.portfolio;
        let mut metrics = Self::from_parts(
            portfolio.initial_capital(),
            result.final_value,
            portfolio.equity_curve(),
            portfolio.history(),
            risk_free_rate,
        );
        metrics.total_trading_costs = portfolio.total_trading_costs_paid();
        metrics.total_taxes_paid = portfolio.total_taxes_paid();
        metrics.total_taxes_deferred = portfolio.total_taxes_deferred();
        metrics
    }

    /// Metrics from raw series. Accumulator totals are summed from `trades`.
    pub fn from_parts(
        initial_capital: f64,
        final_value: f64,
        equity_curve: &[EquityPoint],
        trades: &[TradeRecord],
        risk_free_rate: f64,
    ) -> Self {
        let total_return = ratio(final_value - initial_capital, initial_capital);

        let years = equity_curve.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0
        {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let returns = daily_returns(equity_curve);
        let risk = compute_risk_adjusted(&returns, daily_rf);

        let trips = RoundTrips::tally(trades);

        Metrics {
            final_value,
            total_return,
            annualized_return,
            volatility: risk.volatility,
            sharpe_ratio: risk.sharpe,
            sortino_ratio: risk.sortino,
            max_drawdown,
            max_drawdown_duration,
            calmar_ratio: ratio(annualized_return, max_drawdown),
            recovery_factor: ratio(total_return, max_drawdown),
            skewness: skewness(&returns),
            kurtosis: excess_kurtosis(&returns),
            num_trades: trades.len(),
            trades_won: trips.won,
            trades_lost: trips.lost,
            trades_breakeven: trips.breakeven,
            win_rate: ratio(trips.won as f64, trips.count() as f64),
            profit_factor: trips.profit_factor(),
            avg_win: ratio(trips.gross_wins, trips.won as f64),
            avg_loss: ratio(trips.gross_losses, trips.lost as f64),
            largest_win: trips.largest_win,
            largest_loss: trips.largest_loss,
            total_trading_costs: trades.iter().map(|t| t.trading_cost).sum(),
            total_taxes_paid: trades.iter().map(|t| t.tax_paid).sum(),
            total_taxes_deferred: trades.iter().map(|t| t.tax_deferred).sum(),
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// Win/loss tally over closed round trips. A round trip is closed by a SELL
/// record, whose net gain already carries the sell-side cost and tax.
#[derive(Default)]
struct RoundTrips {
    won: usize,
    lost: usize,
    breakeven: usize,
    gross_wins: f64,
    gross_losses: f64,
    largest_win: f64,
    largest_loss: f64,
}

impl RoundTrips {
    fn tally(trades: &[TradeRecord]) -> Self {
        trades
            .iter()
            .filter(|t| t.side == Side::Sell)
            .map(TradeRecord::net_gain)
            .fold(Self::default(), |mut acc, net| {
                match net.partial_cmp(&0.0) {
                    Some(Ordering::Greater) => {
                        acc.won += 1;
                        acc.gross_wins += net;
                        acc.largest_win = acc.largest_win.max(net);
                    }
                    Some(Ordering::Less) => {
                        acc.lost += 1;
                        acc.gross_losses -= net;
                        acc.largest_loss = acc.largest_loss.max(-net);
                    }
                    _ => acc.breakeven += 1,
                }
                acc
            })
    }

    fn count(&self) -> usize {
        self.won + self.lost + self.breakeven
    }

    /// Infinite when there are wins and no losses.
    fn profit_factor(&self) -> f64 {
        match (self.gross_wins > 0.0, self.gross_losses > 0.0) {
            (_, true) => self.gross_wins / self.gross_losses,
            (true, false) => f64::INFINITY,
            (false, false) => 0.0,
        }
    }
}

/// Largest peak-to-trough fall as a fraction of the peak, and the longest
/// run of periods spent below a peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            if point.equity < peak {
                current_dd_duration += 1;
                max_dd_duration = max_dd_duration.max(current_dd_duration);
            }
        }
    }

    (max_dd, max_dd_duration)
}

struct RiskStats {
    volatility: f64,
    sharpe: f64,
    sortino: f64,
}

fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| ratio(w[1].equity - w[0].equity, w[0].equity))
        .collect()
}

fn compute_risk_adjusted(returns: &[f64], daily_rf: f64) -> RiskStats {
    if returns.is_empty() {
        return RiskStats {
            volatility: 0.0,
            sharpe: 0.0,
            sortino: 0.0,
        };
    }

    let n = returns.len() as f64;
    let mean = mean(returns);

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let annualizer = TRADING_DAYS_PER_YEAR.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = ratio(excess_return, stddev) * annualizer;

    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside_sq / n).sqrt();

    let sortino = ratio(excess_return, downside_stddev) * annualizer;

    RiskStats {
        volatility: stddev * annualizer,
        sharpe,
        sortino,
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sum of `(x - mean)^power` over `values`.
fn central_sum(values: &[f64], mean: f64, power: i32) -> f64 {
    values.iter().map(|x| (x - mean).powi(power)).sum()
}

/// Bias-adjusted sample skewness (G1). Zero below three samples or when the
/// series is flat.
fn skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let n = values.len() as f64;
    let m = mean(values);
    let m2 = central_sum(values, m, 2) / n;
    let m3 = central_sum(values, m, 3) / n;
    if m2 <= f64::EPSILON * f64::EPSILON {
        return 0.0;
    }
    (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5)
}

/// Bias-adjusted sample excess kurtosis (G2). Zero below four samples or
/// when the series is flat.
fn excess_kurtosis(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return 0.0;
    }
    let n = values.len() as f64;
    let m = mean(values);
    let s2 = central_sum(values, m, 2);
    let s4 = central_sum(values, m, 4);
    if s2 <= f64::EPSILON * f64::EPSILON {
        return 0.0;
    }
    let scaled = (n + 1.0) * n * (n - 1.0) * s4 / (s2 * s2);
    (scaled - 3.0 * (n - 1.0).powi(2)) / ((n - 2.0) * (n - 3.0))
}

/// Relative performance of a strategy against a benchmark run, over the
/// daily returns both curves share by date.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkComparison {
    /// Days with a return on both curves.
    pub periods: usize,
    /// Annualized standard deviation of the excess return.
    pub tracking_error: f64,
    /// Annualized mean excess return over tracking error.
    pub information_ratio: f64,
    pub beta: f64,
    /// Annualized Jensen's alpha.
    pub alpha: f64,
    pub correlation: f64,
}

impl BenchmarkComparison {
    /// `None` when fewer than two daily returns line up.
    pub fn compute(
        strategy: &[EquityPoint],
        benchmark: &[EquityPoint],
        risk_free_rate: f64,
    ) -> Option<Self> {
        let bench_by_date: HashMap<NaiveDate, f64> = dated_returns(benchmark).collect();
        let (strat, bench): (Vec<f64>, Vec<f64>) = dated_returns(strategy)
            .filter_map(|(date, r)| bench_by_date.get(&date).map(|&b| (r, b)))
            .unzip();
        if strat.len() < 2 {
            return None;
        }

        let n = strat.len() as f64;
        let annualizer = TRADING_DAYS_PER_YEAR.sqrt();
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;

        let excess: Vec<f64> = strat.iter().zip(&bench).map(|(s, b)| s - b).collect();
        let excess_mean = mean(&excess);
        let tracking_error =
            (central_sum(&excess, excess_mean, 2) / (n - 1.0)).sqrt() * annualizer;
        let information_ratio = ratio(excess_mean * TRADING_DAYS_PER_YEAR, tracking_error);

        let strat_mean = mean(&strat);
        let bench_mean = mean(&bench);
        let covariance = strat
            .iter()
            .zip(&bench)
            .map(|(s, b)| (s - strat_mean) * (b - bench_mean))
            .sum::<f64>()
            / (n - 1.0);
        let strat_var = central_sum(&strat, strat_mean, 2) / (n - 1.0);
        let bench_var = central_sum(&bench, bench_mean, 2) / (n - 1.0);

        let beta = ratio(covariance, bench_var);
        let alpha =
            ((strat_mean - daily_rf) - beta * (bench_mean - daily_rf)) * TRADING_DAYS_PER_YEAR;
        let correlation = ratio(covariance, (strat_var * bench_var).sqrt());

        Some(BenchmarkComparison {
            periods: strat.len(),
            tracking_error,
            information_ratio,
            beta,
            alpha,
            correlation,
        })
    }
}

/// Daily returns keyed by the date they were earned on.
fn dated_returns(curve: &[EquityPoint]) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
    curve
        .windows(2)
        .map(|w| (w[1].date, ratio(w[1].equity - w[0].equity, w[0].equity)))
}
