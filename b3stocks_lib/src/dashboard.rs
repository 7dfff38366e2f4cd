//! Assembles what the single-stock and comparison views display.
//!
//! Fetch failures are collected per ticker so the rest of a view can still
//! render. Engine functions only run once their preconditions hold.

use serde::Serialize;

use crate::client::MarketDataClient;
use crate::error::{FetchError, StockDashError};
use crate::quote::QuoteSnapshot;
use crate::series::{ClosePriceMatrix, CumulativeReturnMatrix, PriceTable, ReturnMatrix};
use crate::statistics::{
    compute_return_matrix, compute_statistics, correlation_matrix, cumulative_return_series,
    rank_annualized_volatility, rank_coefficient_variation, rank_cumulative_returns,
    CorrelationMatrix, RankEntry, StatBundle,
};
use crate::validation::{require_selection, MIN_COMPARISON_TICKERS};
use crate::Period;

/// A ticker whose data could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerFailure {
    pub ticker: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: FetchError,
}

fn serialize_display<S: serde::Serializer>(
    error: &FetchError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Everything the single-stock view shows. The quote and the history are
/// fetched independently; either may fail without hiding the other.
#[derive(Debug, Clone)]
pub struct StockDashboard {
    pub ticker: String,
    pub period: Period,
    pub quote: Result<QuoteSnapshot, FetchError>,
    pub history: Result<PriceTable, FetchError>,
    /// `None` when the history failed or came back empty.
    pub statistics: Option<StatBundle>,
}

impl StockDashboard {
    pub async fn load(client: &MarketDataClient, ticker: &str, period: Period) -> Self {
        let quote = client.load_ticker_info_today(ticker).await;
        let history = client.load_ticker_history(ticker, period).await;
        let statistics = history
            .as_ref()
            .ok()
            .and_then(|table| compute_statistics(table).ok());

        Self {
            ticker: ticker.to_string(),
            period,
            quote,
            history,
            statistics,
        }
    }
}

/// Multi-ticker comparison: cumulative returns, rankings and correlation.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub period: Period,
    pub prices: ClosePriceMatrix,
    pub returns: ReturnMatrix,
    pub cumulative_returns: CumulativeReturnMatrix,
    pub cumulative_ranking: Vec<RankEntry>,
    pub volatility_ranking: Vec<RankEntry>,
    pub variation_ranking: Vec<RankEntry>,
    pub correlation: CorrelationMatrix,
    /// Tickers that returned no bars for the period.
    pub empty: Vec<String>,
    pub failures: Vec<TickerFailure>,
}

impl ComparisonReport {
    /// Runs the engine over a close price matrix. Requires at least two
    /// ticker columns.
    pub fn build(period: Period, prices: ClosePriceMatrix) -> Result<Self, StockDashError> {
        if prices.len() < MIN_COMPARISON_TICKERS {
            return Err(StockDashError::Precondition(format!(
                "comparison needs at least {} tickers with data, got {}",
                MIN_COMPARISON_TICKERS,
                prices.len()
            )));
        }

        let returns = compute_return_matrix(&prices);
        Ok(Self {
            period,
            cumulative_returns: cumulative_return_series(&returns),
            cumulative_ranking: rank_cumulative_returns(&returns),
            volatility_ranking: rank_annualized_volatility(&returns),
            variation_ranking: rank_coefficient_variation(&prices),
            correlation: correlation_matrix(&returns),
            returns,
            prices,
            empty: Vec::new(),
            failures: Vec::new(),
        })
    }

    /// Validates the selection, fetches every ticker and builds the report.
    ///
    /// With fewer than two tickers selected nothing is fetched. Tickers that
    /// fail are listed in `failures`; the report still needs two tickers with
    /// data to be built.
    pub async fn load<F>(
        client: &MarketDataClient,
        tickers: &[String],
        period: Period,
        on_fetched: F,
    ) -> Result<Self, StockDashError>
    where
        F: FnMut(&str),
    {
        require_selection(tickers, MIN_COMPARISON_TICKERS)?;

        let fetched = client.load_close_prices(tickers, period, on_fetched).await;
        if fetched.matrix.len() < MIN_COMPARISON_TICKERS {
            let reasons: Vec<String> = fetched
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.ticker, f.error))
                .chain(fetched.empty.iter().map(|t| format!("{}: no data", t)))
                .collect();
            return Err(StockDashError::Precondition(format!(
                "only {} of {} tickers returned data ({})",
                fetched.matrix.len(),
                tickers.len(),
                reasons.join("; ")
            )));
        }

        let mut report = Self::build(period, fetched.matrix)?;
        report.empty = fetched.empty;
        report.failures = fetched.failures;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::series::{SeriesMatrix, TickerSeries};
    use chrono::NaiveDate;

    fn column(ticker: &str, closes: &[f64]) -> TickerSeries {
        TickerSeries::new(
            ticker,
            closes
                .iter()
                .enumerate()
                .map(|(i, c)| (NaiveDate::from_ymd_opt(2024, 5, i as u32 + 1).unwrap(), *c))
                .collect(),
        )
    }

    #[test]
    fn build_requires_two_columns() {
        let prices = SeriesMatrix::from_columns(vec![column("PETR4.SA", &[1.0, 2.0])]);
        let err = ComparisonReport::build(Period::OneYear, prices).unwrap_err();
        assert!(matches!(err, StockDashError::Precondition(_)));
    }

    #[test]
    fn build_fills_every_view() {
        let prices = SeriesMatrix::from_columns(vec![
            column("PETR4.SA", &[30.0, 31.0, 30.5]),
            column("VALE3.SA", &[60.0, 59.0, 61.0]),
        ]);
        let report = ComparisonReport::build(Period::SixMonths, prices).unwrap();
        assert_eq!(report.returns.len(), 2);
        assert_eq!(report.cumulative_returns.len(), 2);
        assert_eq!(report.cumulative_ranking.len(), 2);
        assert_eq!(report.volatility_ranking.len(), 2);
        assert_eq!(report.variation_ranking.len(), 2);
        assert_eq!(report.correlation.tickers, vec!["PETR4.SA", "VALE3.SA"]);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn fewer_than_two_tickers_short_circuits() {
        let config = DashboardConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..DashboardConfig::default()
        };
        let client = MarketDataClient::new(&config);
        let mut fetched = 0;
        let err = ComparisonReport::load(
            &client,
            &["PETR4.SA".to_string()],
            Period::OneYear,
            |_| fetched += 1,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StockDashError::Precondition(_)));
        assert_eq!(fetched, 0);

        let err = ComparisonReport::load(&client, &[], Period::OneYear, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, StockDashError::Precondition(_)));
    }

    #[test]
    fn failure_serializes_message() {
        let failure = TickerFailure {
            ticker: "ZZZZ3.SA".to_string(),
            error: FetchError::TickerNotFound("ZZZZ3.SA".to_string()),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["error"], "Ticker not found: ZZZZ3.SA");
    }
}
