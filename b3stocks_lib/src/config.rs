//! Runtime configuration: defaults, an optional TOML file, then `B3STOCKS_*`
//! environment overrides.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::error::StockDashError;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";

/// Backoff settings for retryable upstream failures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 2000,
            max_delay_ms: 30000,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff capped at `max_delay_ms`, with +/-20% jitter.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(30) as u32;
        let exp = 1u64 << shift;
        let base = self
            .base_delay_ms
            .saturating_mul(exp)
            .min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((base as f64 * jitter) as u64)
    }
}

/// Settings for the market-data accessor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub base_url: String,
    pub cookie_url: String,
    pub request_timeout_secs: u64,
    /// Maximum staleness of a cached quote snapshot.
    pub quote_ttl_secs: u64,
    /// Historical tables never expire when unset.
    pub history_ttl_secs: Option<u64>,
    /// Replace close with the split/dividend adjusted close.
    pub auto_adjust: bool,
    pub retry: RetryConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_url: DEFAULT_COOKIE_URL.to_string(),
            request_timeout_secs: 30,
            quote_ttl_secs: 300,
            history_ttl_secs: None,
            auto_adjust: true,
            retry: RetryConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, StockDashError> {
        toml::from_str(content).map_err(|e| StockDashError::Config(e.to_string()))
    }

    /// Loads the configuration file at `path` (if any) and applies
    /// environment overrides from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, StockDashError> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    StockDashError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `B3STOCKS_*` overrides read through `lookup`. Values that do
    /// not parse are rejected rather than silently ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, StockDashError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("B3STOCKS_BASE_URL") {
            self.base_url = url;
        }
        if let Some(url) = lookup("B3STOCKS_COOKIE_URL") {
            self.cookie_url = url;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "B3STOCKS_TIMEOUT_SECS")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "B3STOCKS_QUOTE_TTL_SECS")? {
            self.quote_ttl_secs = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "B3STOCKS_HISTORY_TTL_SECS")? {
            self.history_ttl_secs = Some(v);
        }
        if let Some(v) = parse_var::<bool, _>(&lookup, "B3STOCKS_AUTO_ADJUST")? {
            self.auto_adjust = v;
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "B3STOCKS_RETRY_MAX")? {
            self.retry.max_retries = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "B3STOCKS_RETRY_BASE_MS")? {
            self.retry.base_delay_ms = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "B3STOCKS_RETRY_MAX_MS")? {
            self.retry.max_delay_ms = v;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), StockDashError> {
        if self.request_timeout_secs == 0 {
            return Err(StockDashError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(StockDashError::Config("base_url must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn quote_ttl(&self) -> Duration {
        Duration::from_secs(self.quote_ttl_secs)
    }

    pub fn history_ttl(&self) -> Option<Duration> {
        self.history_ttl_secs.map(Duration::from_secs)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, StockDashError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| StockDashError::Config(format!("{} has invalid value '{}'", key, raw))),
    }
}
