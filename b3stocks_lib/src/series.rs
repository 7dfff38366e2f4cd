//! Price and return series: per-ticker daily bars and date-indexed columns.
//!
//! Every ticker is an explicit ordered `(date, value)` sequence. A matrix is a
//! list of such columns in selection order; columns are never realigned or
//! padded, so a ticker that misses a session simply has no point for that date.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of OHLCV data for one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Deserialize)]
struct PriceTableParts {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl From<PriceTableParts> for PriceTable {
    fn from(parts: PriceTableParts) -> Self {
        PriceTable::new(parts.ticker, parts.bars)
    }
}

/// Daily bars for a single ticker with strictly increasing dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PriceTableParts")]
pub struct PriceTable {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceTable {
    /// Builds a table, sorting bars by date. When a date repeats, the bar
    /// that came later in `bars` wins.
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self {
            ticker: ticker.into(),
            bars: deduped,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// The close column as a dated series.
    pub fn close_series(&self) -> TickerSeries {
        TickerSeries {
            ticker: self.ticker.clone(),
            points: self.bars.iter().map(|b| (b.date, b.close)).collect(),
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

#[derive(Deserialize)]
struct TickerSeriesParts {
    ticker: String,
    points: Vec<(NaiveDate, f64)>,
}

impl From<TickerSeriesParts> for TickerSeries {
    fn from(parts: TickerSeriesParts) -> Self {
        TickerSeries::new(parts.ticker, parts.points)
    }
}

/// A dated value column for one ticker, dates strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TickerSeriesParts")]
pub struct TickerSeries {
    ticker: String,
    points: Vec<(NaiveDate, f64)>,
}

impl TickerSeries {
    /// Builds a series, sorting by date; a repeated date keeps the later point.
    pub fn new(ticker: impl Into<String>, mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|(d, _)| *d);
        let mut deduped: Vec<(NaiveDate, f64)> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.0 == point.0 => *last = point,
                _ => deduped.push(point),
            }
        }
        Self {
            ticker: ticker.into(),
            points: deduped,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|(d, _)| *d).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }

    /// Value on `date`, if this ticker has an observation for it.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|i| self.points[i].1)
    }
}

/// Date-indexed columns, one per ticker, in selection order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesMatrix {
    columns: Vec<TickerSeries>,
}

/// Close prices per ticker.
pub type ClosePriceMatrix = SeriesMatrix;
/// Fractional daily returns per ticker; each column starts at 0.
pub type ReturnMatrix = SeriesMatrix;
/// Running compounded return in percent per ticker.
pub type CumulativeReturnMatrix = SeriesMatrix;

impl SeriesMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a matrix from columns; a repeated ticker replaces the earlier
    /// column in place.
    pub fn from_columns(columns: Vec<TickerSeries>) -> Self {
        let mut matrix = Self::new();
        for column in columns {
            matrix.push(column);
        }
        matrix
    }

    /// Close prices of each table. Empty tables contribute no column.
    pub fn from_price_tables(tables: &[PriceTable]) -> Self {
        Self::from_columns(
            tables
                .iter()
                .filter(|t| !t.is_empty())
                .map(PriceTable::close_series)
                .collect(),
        )
    }

    /// Appends a column, or replaces the existing column for the same ticker.
    pub fn push(&mut self, column: TickerSeries) {
        match self.columns.iter_mut().find(|c| c.ticker == column.ticker) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    pub fn columns(&self) -> &[TickerSeries] {
        &self.columns
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.ticker()).collect()
    }

    pub fn column(&self, ticker: &str) -> Option<&TickerSeries> {
        self.columns.iter().find(|c| c.ticker == ticker)
    }

    /// Number of ticker columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Sorted union of every column's dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.columns
            .iter()
            .flat_map(|c| c.points.iter().map(|(d, _)| *d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn get(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        self.column(ticker).and_then(|c| c.get(date))
    }

    /// Grid view for display: one row per date in the union, one cell per
    /// column, `None` where a ticker has no observation.
    pub fn rows(&self) -> Vec<(NaiveDate, Vec<Option<f64>>)> {
        self.dates()
            .into_iter()
            .map(|date| {
                let cells = self.columns.iter().map(|c| c.get(date)).collect();
                (date, cells)
            })
            .collect()
    }

    /// Applies `f` to every column's values, keeping dates and ticker order.
    pub(crate) fn map_columns<F>(&self, f: F) -> SeriesMatrix
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = f(c.values().as_slice());
                TickerSeries {
                    ticker: c.ticker.clone(),
                    points: c.dates().into_iter().zip(values).collect(),
                }
            })
            .collect();
        SeriesMatrix { columns }
    }
}
