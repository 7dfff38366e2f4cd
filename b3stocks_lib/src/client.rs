//! Caching and retrying accessor over the market-data API client.

use b3stocks_api::types::ChartResult;
use b3stocks_api::{ChartQuery, Client, QuoteSummaryQuery};
use chrono::DateTime;

use crate::cache::MemoryCache;
use crate::config::{DashboardConfig, RetryConfig};
use crate::dashboard::TickerFailure;
use crate::error::FetchError;
use crate::quote::QuoteSnapshot;
use serde::{Deserialize, Serialize};

use crate::series::{ClosePriceMatrix, PriceBar, PriceTable, SeriesMatrix, TickerSeries};
use crate::statistics::round2;
use crate::Period;

/// Market-data accessor with read-through caches.
///
/// Quote snapshots are cached for the configured TTL (5 minutes by default).
/// Historical tables are cached without expiry unless a history TTL is set.
/// Every value handed out is complete and validated: upstream failures come
/// back as [`FetchError`], never as a partial table.
///
/// Caches belong to this instance. Callers that need isolated sessions
/// create one client per session.
pub struct MarketDataClient {
    inner: Client,
    history_cache: MemoryCache,
    quote_cache: MemoryCache,
    auto_adjust: bool,
    retry: RetryConfig,
}

/// Result of a multi-ticker close price fetch.
#[derive(Debug, Clone)]
pub struct ClosePriceFetch {
    /// One column per ticker that returned at least one bar.
    pub matrix: ClosePriceMatrix,
    /// Tickers that returned a valid but empty history.
    pub empty: Vec<String>,
    pub failures: Vec<TickerFailure>,
}

impl MarketDataClient {
    pub fn new(config: &DashboardConfig) -> Self {
        let inner = Client::with_base_url(&config.base_url)
            .with_cookie_url(&config.cookie_url)
            .with_timeout(config.request_timeout());
        Self::with_client(inner, config)
    }

    /// Wraps an existing API client. Used for testing with wiremock.
    pub fn with_client(inner: Client, config: &DashboardConfig) -> Self {
        let history_cache = match config.history_ttl() {
            Some(ttl) => MemoryCache::new(ttl),
            None => MemoryCache::unbounded(),
        };
        Self {
            inner,
            history_cache,
            quote_cache: MemoryCache::new(config.quote_ttl()),
            auto_adjust: config.auto_adjust,
            retry: config.retry.clone(),
        }
    }

    async fn with_retry<T, F, Fut>(&self, label: &str, mut f: F) -> Result<T, b3stocks_api::Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, b3stocks_api::Error>>,
    {
        let mut attempt = 0usize;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.retry.max_retries || !is_retryable(&err) {
                        return Err(err);
                    }
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        "{} request failed (attempt {}/{}), retrying in {:.1}s",
                        label,
                        attempt,
                        self.retry.max_retries,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Daily bars for `ticker` over `period`, rounded to 2 decimals, served
    /// from cache when present.
    pub async fn load_ticker_history(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<PriceTable, FetchError> {
        self.load_history(ticker, period).await.map(|h| h.table)
    }

    /// Full-precision closes for `ticker` over `period`, on the same dates as
    /// [`load_ticker_history`](Self::load_ticker_history).
    pub async fn load_close_series(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<TickerSeries, FetchError> {
        self.load_history(ticker, period).await.map(|h| h.closes)
    }

    async fn load_history(&self, ticker: &str, period: Period) -> Result<History, FetchError> {
        let cache_key = format!("history:{}:{}", ticker, period);

        if let Some(cached) = self.history_cache.get(&cache_key) {
            match serde_json::from_str::<History>(&cached) {
                Ok(history) => {
                    tracing::debug!("history cache hit for {}", cache_key);
                    return Ok(history);
                }
                Err(e) => {
                    tracing::warn!("Dropping unreadable cache entry {}: {}", cache_key, e);
                    self.history_cache.remove(&cache_key);
                }
            }
        }

        let query = ChartQuery::default().with_period(period);
        let chart = self
            .with_retry("chart", || self.inner.get_chart(ticker, &query))
            .await?;
        let history = chart_to_history(ticker, &chart, self.auto_adjust)?;

        if let Ok(json) = serde_json::to_string(&history) {
            self.history_cache.set(cache_key, json);
        }
        Ok(history)
    }

    /// Full-precision close prices for several tickers, each fetched
    /// independently.
    ///
    /// A failing ticker is recorded in `failures` and does not stop the
    /// others. `on_fetched` is called after each ticker, successful or not.
    pub async fn load_close_prices<F>(
        &self,
        tickers: &[String],
        period: Period,
        mut on_fetched: F,
    ) -> ClosePriceFetch
    where
        F: FnMut(&str),
    {
        let mut matrix = SeriesMatrix::new();
        let mut empty = Vec::new();
        let mut failures = Vec::new();

        for ticker in tickers {
            match self.load_close_series(ticker, period).await {
                Ok(closes) if closes.is_empty() => {
                    tracing::info!("{} returned no bars for {}", ticker, period);
                    empty.push(ticker.clone());
                }
                Ok(closes) => matrix.push(closes),
                Err(error) => {
                    tracing::warn!("Skipping {}: {}", ticker, error);
                    failures.push(TickerFailure {
                        ticker: ticker.clone(),
                        error,
                    });
                }
            }
            on_fetched(ticker);
        }

        ClosePriceFetch {
            matrix,
            empty,
            failures,
        }
    }

    /// Current quote and company profile, at most one quote TTL old.
    pub async fn load_ticker_info_today(&self, ticker: &str) -> Result<QuoteSnapshot, FetchError> {
        let cache_key = format!("quote:{}", ticker);

        if let Some(cached) = self.quote_cache.get(&cache_key) {
            match serde_json::from_str::<QuoteSnapshot>(&cached) {
                Ok(snapshot) => {
                    tracing::debug!("quote cache hit for {}", cache_key);
                    return Ok(snapshot);
                }
                Err(e) => {
                    tracing::warn!("Dropping unreadable cache entry {}: {}", cache_key, e);
                    self.quote_cache.remove(&cache_key);
                }
            }
        }

        let query = QuoteSummaryQuery::default();
        let summary = self
            .with_retry("quote", || self.inner.get_quote_summary(ticker, &query))
            .await?;
        let snapshot = QuoteSnapshot::from_summary(ticker, &summary)?;

        if let Ok(json) = serde_json::to_string(&snapshot) {
            self.quote_cache.set(cache_key, json);
        }
        Ok(snapshot)
    }

    /// Empties both caches.
    pub fn clear_cache(&self) {
        self.history_cache.clear();
        self.quote_cache.clear();
    }
}

fn is_retryable(err: &b3stocks_api::Error) -> bool {
    match err {
        b3stocks_api::Error::RequestFailed => true,
        b3stocks_api::Error::HttpStatus { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// A converted chart: the rounded display table and the unrounded closes
/// comparisons are computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct History {
    table: PriceTable,
    closes: TickerSeries,
}

/// Converts a chart response into a validated price table, rounded to 2
/// decimals.
///
/// Bars with any missing OHLC value are placeholders and are dropped. Dates
/// are the exchange-local calendar day. With `auto_adjust`, open/high/low
/// are scaled by adjclose/close and close becomes the adjusted close.
pub fn chart_to_price_table(
    ticker: &str,
    chart: &ChartResult,
    auto_adjust: bool,
) -> Result<PriceTable, FetchError> {
    chart_to_history(ticker, chart, auto_adjust).map(|h| h.table)
}

/// Closes of the same bars [`chart_to_price_table`] keeps, without rounding.
pub fn chart_to_close_series(
    ticker: &str,
    chart: &ChartResult,
    auto_adjust: bool,
) -> Result<TickerSeries, FetchError> {
    chart_to_history(ticker, chart, auto_adjust).map(|h| h.closes)
}

fn chart_to_history(
    ticker: &str,
    chart: &ChartResult,
    auto_adjust: bool,
) -> Result<History, FetchError> {
    let n = chart.timestamp.len();
    if n == 0 {
        return Ok(History {
            table: PriceTable::new(ticker, Vec::new()),
            closes: TickerSeries::new(ticker, Vec::new()),
        });
    }

    let quote = chart
        .indicators
        .quote
        .first()
        .ok_or_else(|| FetchError::Malformed(format!("{}: chart has no quote data", ticker)))?;

    let columns = [
        ("open", &quote.open),
        ("high", &quote.high),
        ("low", &quote.low),
        ("close", &quote.close),
    ];
    for (name, column) in columns {
        if column.len() != n {
            return Err(FetchError::Malformed(format!(
                "{}: {} has {} values for {} timestamps",
                ticker,
                name,
                column.len(),
                n
            )));
        }
    }
    if !quote.volume.is_empty() && quote.volume.len() != n {
        return Err(FetchError::Malformed(format!(
            "{}: volume has {} values for {} timestamps",
            ticker,
            quote.volume.len(),
            n
        )));
    }

    let adjusted = if auto_adjust {
        chart.indicators.adjclose.first().map(|a| &a.adjclose)
    } else {
        None
    };
    if let Some(adj) = adjusted {
        if adj.len() != n {
            return Err(FetchError::Malformed(format!(
                "{}: adjclose has {} values for {} timestamps",
                ticker,
                adj.len(),
                n
            )));
        }
    }

    let offset = chart.meta.gmtoffset;
    let mut bars = Vec::with_capacity(n);
    let mut closes = Vec::with_capacity(n);
    for (i, &ts) in chart.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) =
            (quote.open[i], quote.high[i], quote.low[i], quote.close[i])
        else {
            continue;
        };
        let date = DateTime::from_timestamp(ts.saturating_add(offset), 0)
            .ok_or_else(|| FetchError::Malformed(format!("{}: bad timestamp {}", ticker, ts)))?
            .date_naive();
        let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);

        let (open, high, low, close) = match adjusted.and_then(|adj| adj[i]) {
            Some(adj_close) if close != 0.0 => {
                let ratio = adj_close / close;
                (open * ratio, high * ratio, low * ratio, adj_close)
            }
            _ => (open, high, low, close),
        };

        closes.push((date, close));
        bars.push(PriceBar {
            date,
            open: round2(open),
            high: round2(high),
            low: round2(low),
            close: round2(close),
            volume: round2(volume),
        });
    }

    Ok(History {
        table: PriceTable::new(ticker, bars),
        closes: TickerSeries::new(ticker, closes),
    })
}
