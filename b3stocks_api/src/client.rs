//! HTTP client for the Yahoo Finance chart and quote summary endpoints.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    query::{ChartQuery, Query, QuoteSummaryQuery},
    types::{ChartResponse, ChartResult, QuoteSummaryResponse, QuoteSummaryResult, UpstreamError},
    user_agent::get_user_agent,
    Error,
};

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Yahoo Finance JSON API.
///
/// Each request builds a fresh `reqwest::Client` with a randomized browser
/// user agent and a bounded timeout. Cookies live in a shared jar so the
/// session cookie obtained while fetching a crumb is sent with later quote
/// requests.
pub struct Client {
    /// Base URL for the API. Defaults to `https://query2.finance.yahoo.com`.
    base_api_url: String,
    /// URL hit once to obtain a session cookie before asking for a crumb.
    cookie_url: String,
    timeout: Duration,
    jar: Arc<Jar>,
    crumb: Mutex<Option<String>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a new client pointing at the production Yahoo Finance API.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL).with_cookie_url(DEFAULT_COOKIE_URL)
    }

    /// Creates a new client with a custom base URL. Used for testing with wiremock.
    ///
    /// The cookie URL defaults to the base URL.
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            cookie_url: format!("{}/", base),
            base_api_url: base,
            timeout: DEFAULT_TIMEOUT,
            jar: Arc::new(Jar::default()),
            crumb: Mutex::new(None),
        }
    }

    pub fn with_cookie_url(mut self, cookie_url: &str) -> Self {
        self.cookie_url = cookie_url.to_string();
        self
    }

    /// Bounds every request, connect through body read, by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn http_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(self.timeout)
            .cookie_provider(Arc::clone(&self.jar))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed
            })
    }

    fn get_url(&self, path: &str, symbol: Option<&str>, query: Option<&impl Query>) -> Result<Url, Error> {
        let mut url = Url::parse(format!("{}{}", &self.base_api_url, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::RequestFailed
        })?;
        if let Some(symbol) = symbol {
            url.path_segments_mut()
                .map_err(|_| {
                    tracing::error!("Base URL cannot carry path segments: {}", self.base_api_url);
                    Error::RequestFailed
                })?
                .push(symbol);
        }
        Ok(match query {
            Some(query) => query.add_to_url(&url),
            None => url,
        })
    }

    async fn send(&self, url: Url) -> Result<(reqwest::StatusCode, String), Error> {
        let client = self.http_client()?;
        let resp = client
            .get(url)
            .header("accept", "application/json, text/plain, */*")
            .header("accept-language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to get resource: {}", e);
                Error::RequestFailed
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::RequestFailed
        })?;
        Ok((status, body))
    }

    async fn get<T, Q>(&self, path: &str, symbol: &str, query: Option<&Q>) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Query,
    {
        let url = self.get_url(path, Some(symbol), query)?;
        let (status, body) = self.send(url).await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!("Symbol {} not found upstream", symbol);
            return Err(Error::NotFound(symbol.to_string()));
        }

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse resource: {} | body: {}", e, snippet);
            Error::Parse(e.to_string())
        })
    }

    /// Fetches the OHLCV chart for one symbol.
    pub async fn get_chart(&self, symbol: &str, query: &ChartQuery) -> Result<ChartResult, Error> {
        let resp = self
            .get::<ChartResponse, ChartQuery>("/v8/finance/chart", symbol, Some(query))
            .await?;
        first_result(resp.chart.result, resp.chart.error, symbol)
    }

    /// Fetches the live quote and company profile for one symbol.
    ///
    /// When the query carries no crumb, the cached session crumb is used,
    /// fetching one first if needed. A missing crumb is not fatal; the
    /// request is sent without it.
    pub async fn get_quote_summary(
        &self,
        symbol: &str,
        query: &QuoteSummaryQuery,
    ) -> Result<QuoteSummaryResult, Error> {
        let mut query = query.clone();
        if query.crumb.is_none() {
            query.crumb = self.crumb().await;
        }

        let resp = match self.fetch_quote_summary(symbol, &query).await {
            Err(Error::HttpStatus { status: 401, body }) => {
                // Stale crumb or cookie: negotiate a fresh pair and retry once.
                self.clear_crumb();
                match self.refresh_crumb().await {
                    Ok(crumb) => {
                        tracing::debug!("Retrying quote summary for {} with a new crumb", symbol);
                        query.crumb = Some(crumb);
                        self.fetch_quote_summary(symbol, &query).await?
                    }
                    Err(e) => {
                        tracing::warn!("Crumb refresh after 401 failed: {}", e);
                        return Err(Error::HttpStatus { status: 401, body });
                    }
                }
            }
            other => other?,
        };
        first_result(resp.quote_summary.result, resp.quote_summary.error, symbol)
    }

    async fn fetch_quote_summary(
        &self,
        symbol: &str,
        query: &QuoteSummaryQuery,
    ) -> Result<QuoteSummaryResponse, Error> {
        self.get::<QuoteSummaryResponse, QuoteSummaryQuery>(
            "/v10/finance/quoteSummary",
            symbol,
            Some(query),
        )
        .await
    }

    async fn crumb(&self) -> Option<String> {
        let cached = self.crumb.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if cached.is_some() {
            return cached;
        }
        match self.refresh_crumb().await {
            Ok(crumb) => Some(crumb),
            Err(e) => {
                tracing::warn!("Could not obtain crumb, continuing without it: {}", e);
                None
            }
        }
    }

    /// Primes the session cookie and requests a new crumb, replacing any cached one.
    pub async fn refresh_crumb(&self) -> Result<String, Error> {
        let client = self.http_client()?;
        // Only the Set-Cookie header matters here; the cookie host answers 404.
        if let Err(e) = client.get(&self.cookie_url).send().await {
            tracing::debug!("Cookie priming request failed: {}", e);
        }

        let url = self.get_url("/v1/test/getcrumb", None, None::<&ChartQuery>)?;
        let (status, body) = self.send(url).await?;
        let crumb = body.trim();
        if !status.is_success() || crumb.is_empty() || crumb.contains('<') {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        tracing::debug!("Obtained new crumb");
        *self.crumb.lock().unwrap_or_else(|e| e.into_inner()) = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    /// Forgets the cached crumb.
    pub fn clear_crumb(&self) {
        *self.crumb.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

fn first_result<T>(
    result: Option<Vec<T>>,
    error: Option<UpstreamError>,
    symbol: &str,
) -> Result<T, Error> {
    if let Some(err) = error {
        if err.is_not_found() {
            return Err(Error::NotFound(symbol.to_string()));
        }
        return Err(Error::Upstream {
            code: err.code,
            description: err.description.unwrap_or_default(),
        });
    }
    result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| Error::Parse(format!("response for {} contained no result", symbol)))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
