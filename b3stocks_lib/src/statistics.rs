//! Return and statistics engine.
//!
//! Pure functions over price tables and per-ticker series. Nothing here
//! fetches, caches or formats; identical input always yields identical
//! output. Every matrix operation works column by column, so tickers with
//! different trading calendars never contaminate each other. Correlation is
//! the only cross-ticker computation and joins each pair on shared dates.

use serde::{Deserialize, Serialize};

use crate::error::StockDashError;
use crate::series::{
    ClosePriceMatrix, CumulativeReturnMatrix, PriceTable, ReturnMatrix, TickerSeries,
};

/// Trading sessions per year used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Descriptive statistics for one ticker over a period, at full precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBundle {
    /// Annualized volatility of daily returns, in percent.
    pub volatility: f64,
    /// Compounded return over the period, in percent.
    pub cumulative_return: f64,
    pub high: f64,
    pub low: f64,
    pub median: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Standard deviation of close over mean close, in percent.
    pub coefficient_variation: f64,
}

/// One line of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub ticker: String,
    pub value: f64,
}

/// Pairwise Pearson correlation of daily returns.
///
/// `values[i][j]` is `None` when the pair has fewer than two shared dates or
/// either side has zero variance over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        self.values[i][j]
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Daily fractional returns, `r[i] = p[i] / p[i-1] - 1` with `r[0] = 0`.
///
/// A zero previous price yields 0 instead of an infinite return.
pub fn compute_returns(prices: &[f64]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(prices.len());
    for (i, &price) in prices.iter().enumerate() {
        if i == 0 {
            returns.push(0.0);
            continue;
        }
        let prev = prices[i - 1];
        returns.push(if prev == 0.0 { 0.0 } else { price / prev - 1.0 });
    }
    returns
}

/// Applies [`compute_returns`] to every column of a close price matrix.
pub fn compute_return_matrix(prices: &ClosePriceMatrix) -> ReturnMatrix {
    prices.map_columns(compute_returns)
}

/// Statistics for one ticker's table.
///
/// With a single bar, volatility, standard deviation and cumulative return
/// are all 0.
pub fn compute_statistics(table: &PriceTable) -> Result<StatBundle, StockDashError> {
    if table.is_empty() {
        return Err(StockDashError::Precondition(format!(
            "no price data for {}",
            table.ticker()
        )));
    }

    let closes = table.closes();
    let returns = compute_returns(&closes);
    let std_dev = sample_std_dev(&closes);
    let mean_close = mean(&closes);

    Ok(StatBundle {
        volatility: annualized_volatility(&returns),
        cumulative_return: cumulative_return(&returns),
        high: table.highs().into_iter().fold(f64::NEG_INFINITY, f64::max),
        low: table.lows().into_iter().fold(f64::INFINITY, f64::min),
        median: median(&closes),
        mean: mean_close,
        std_dev,
        coefficient_variation: coefficient_variation(std_dev, mean_close),
    })
}

/// Total compounded return per ticker, highest first. Sorted on the full
/// precision value; rounding happens after ordering.
pub fn rank_cumulative_returns(returns: &ReturnMatrix) -> Vec<RankEntry> {
    rank(returns.columns(), cumulative_return, Rounding::AfterSort)
}

/// Running compounded return in percent, per ticker, on that ticker's dates.
pub fn cumulative_return_series(returns: &ReturnMatrix) -> CumulativeReturnMatrix {
    returns.map_columns(|values| {
        let mut growth = 1.0;
        values
            .iter()
            .map(|r| {
                growth *= 1.0 + r;
                (growth - 1.0) * 100.0
            })
            .collect()
    })
}

/// Annualized volatility per ticker, highest first.
pub fn rank_annualized_volatility(returns: &ReturnMatrix) -> Vec<RankEntry> {
    rank(returns.columns(), annualized_volatility, Rounding::BeforeSort)
}

/// Coefficient of variation of close prices per ticker, highest first.
pub fn rank_coefficient_variation(prices: &ClosePriceMatrix) -> Vec<RankEntry> {
    rank(
        prices.columns(),
        |values| coefficient_variation(sample_std_dev(values), mean(values)),
        Rounding::BeforeSort,
    )
}

/// Pearson correlation for every pair of return columns.
pub fn correlation_matrix(returns: &ReturnMatrix) -> CorrelationMatrix {
    let columns = returns.columns();
    let n = columns.len();
    let mut values = vec![vec![None; n]; n];

    for i in 0..n {
        for j in i..n {
            let corr = if i == j {
                let v = columns[i].values();
                (v.len() >= 2 && sample_std_dev(&v) > 0.0).then_some(1.0)
            } else {
                let (a, b) = inner_join(&columns[i], &columns[j]);
                pearson(&a, &b)
            };
            values[i][j] = corr;
            values[j][i] = corr;
        }
    }

    CorrelationMatrix {
        tickers: columns.iter().map(|c| c.ticker().to_string()).collect(),
        values,
    }
}

/// Rounds to 2 decimals. Negative zero comes back as zero.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divides by n - 1); 0 for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn cumulative_return(returns: &[f64]) -> f64 {
    (returns.iter().fold(1.0, |acc, &r| acc * (1.0 + r)) - 1.0) * 100.0
}

fn annualized_volatility(returns: &[f64]) -> f64 {
    sample_std_dev(returns) * TRADING_DAYS_PER_YEAR.sqrt() * 100.0
}

fn coefficient_variation(std_dev: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        0.0
    } else {
        std_dev / mean * 100.0
    }
}

/// When a ranking rounds its values relative to ordering them.
#[derive(Clone, Copy, PartialEq)]
enum Rounding {
    /// Values equal to the cent tie and keep column order.
    BeforeSort,
    /// Order follows full precision; displayed values are rounded afterwards.
    AfterSort,
}

/// Ranks columns by `metric`, descending. `sort_by` is stable, so equal
/// values keep column order.
fn rank<F>(columns: &[TickerSeries], metric: F, rounding: Rounding) -> Vec<RankEntry>
where
    F: Fn(&[f64]) -> f64,
{
    let mut entries: Vec<RankEntry> = columns
        .iter()
        .map(|c| {
            let value = metric(c.values().as_slice());
            RankEntry {
                ticker: c.ticker().to_string(),
                value: match rounding {
                    Rounding::BeforeSort => round2(value),
                    Rounding::AfterSort => value,
                },
            }
        })
        .collect();
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    if rounding == Rounding::AfterSort {
        for entry in &mut entries {
            entry.value = round2(entry.value);
        }
    }
    entries
}

fn inner_join(a: &TickerSeries, b: &TickerSeries) -> (Vec<f64>, Vec<f64>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for &(date, value) in a.points() {
        if let Some(other) = b.get(date) {
            left.push(value);
            right.push(other);
        }
    }
    (left, right)
}

fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let ma = mean(a);
    let mb = mean(b);
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}
