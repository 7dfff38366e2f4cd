//! Query builder for the daily chart (OHLCV history) endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use super::common::Query;

/// Look-back window accepted by the chart endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    /// Every period token, shortest window first.
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    /// The token sent to the provider (`1mo`, `1y`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == token)
            .ok_or_else(|| {
                format!(
                    "unknown period '{}'. Valid periods: {}",
                    s,
                    Period::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Bar size requested from the chart endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interval {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        };
        f.write_str(s)
    }
}

/// Parameters for `GET /v8/finance/chart/{symbol}`.
#[derive(Clone, Copy, Debug)]
pub struct ChartQuery {
    pub period: Period,
    pub interval: Interval,
    pub include_adjusted_close: bool,
}

impl Default for ChartQuery {
    fn default() -> Self {
        Self {
            period: Period::default(),
            interval: Interval::default(),
            include_adjusted_close: true,
        }
    }
}

impl ChartQuery {
    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_adjusted_close(mut self, include: bool) -> Self {
        self.include_adjusted_close = include;
        self
    }
}

impl Query for ChartQuery {
    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair("range", self.period.as_str())
            .append_pair("interval", &self.interval.to_string())
            .append_pair(
                "includeAdjustedClose",
                if self.include_adjusted_close {
                    "true"
                } else {
                    "false"
                },
            );
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://query1.finance.yahoo.com/v8/finance/chart/PETR4.SA").unwrap()
    }

    #[test]
    fn default_query() {
        insta::assert_snapshot!(
            ChartQuery::default().add_to_url(&base()).to_string(),
            @"https://query1.finance.yahoo.com/v8/finance/chart/PETR4.SA?range=1y&interval=1d&includeAdjustedClose=true"
        );
    }

    #[test]
    fn custom_period_and_interval() {
        insta::assert_snapshot!(
            ChartQuery::default()
                .with_period(Period::ThreeMonths)
                .with_interval(Interval::Weekly)
                .with_adjusted_close(false)
                .add_to_url(&base())
                .to_string(),
            @"https://query1.finance.yahoo.com/v8/finance/chart/PETR4.SA?range=3mo&interval=1wk&includeAdjustedClose=false"
        );
    }

    #[test]
    fn period_parses_case_insensitively() {
        assert_eq!("1MO".parse::<Period>().unwrap(), Period::OneMonth);
        assert_eq!(" ytd ".parse::<Period>().unwrap(), Period::YearToDate);
    }

    #[test]
    fn period_rejects_unknown_token() {
        let err = "7w".parse::<Period>().unwrap_err();
        assert!(err.contains("7w"));
        assert!(err.contains("1mo"));
    }

    #[test]
    fn period_tokens_round_trip_through_display() {
        for period in Period::ALL {
            assert_eq!(period.to_string().parse::<Period>().unwrap(), period);
        }
    }

    #[test]
    fn period_serializes_as_token() {
        let json = serde_json::to_string(&Period::SixMonths).unwrap();
        assert_eq!(json, "\"6mo\"");
    }
}
