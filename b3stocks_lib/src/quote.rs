//! Point-in-time quote plus company profile for one ticker.

use b3stocks_api::types::{raw_value, QuoteSummaryResult, RawValue};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::statistics::round2;

/// Live quote fields and static company metadata.
///
/// Numeric fields are rounded to 2 decimals; `pct_today` is derived from the
/// rounded last price and previous close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub ticker: String,
    pub last_price: f64,
    pub previous_close: f64,
    pub open: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub pct_today: f64,
    pub long_name: String,
    pub summary: String,
    pub sector: String,
    pub industry: String,
    pub website: String,
}

impl QuoteSnapshot {
    /// Maps an upstream quote summary onto a snapshot.
    ///
    /// Day fields come from `summaryDetail`, falling back to the matching
    /// `price.regularMarket*` field. Profile text is optional (funds and
    /// indices carry no asset profile) and defaults to empty.
    pub fn from_summary(ticker: &str, result: &QuoteSummaryResult) -> Result<Self, FetchError> {
        let price = result
            .price
            .as_ref()
            .ok_or(FetchError::MissingField("price"))?;
        let detail = result.summary_detail.clone().unwrap_or_default();
        let profile = result.asset_profile.clone().unwrap_or_default();

        let last_price = require(&price.regular_market_price, "regularMarketPrice")?;
        let previous_close = either(
            &detail.previous_close,
            &price.regular_market_previous_close,
            "previousClose",
        )?;
        let open = either(&detail.open, &price.regular_market_open, "open")?;
        let day_high = either(&detail.day_high, &price.regular_market_day_high, "dayHigh")?;
        let day_low = either(&detail.day_low, &price.regular_market_day_low, "dayLow")?;

        let long_name = price
            .long_name
            .clone()
            .or_else(|| price.short_name.clone())
            .filter(|n| !n.trim().is_empty())
            .ok_or(FetchError::MissingField("longName"))?;

        let pct_today = if previous_close == 0.0 {
            0.0
        } else {
            (last_price / previous_close - 1.0) * 100.0
        };

        Ok(Self {
            ticker: ticker.to_string(),
            last_price,
            previous_close,
            open,
            day_high,
            day_low,
            pct_today,
            long_name,
            summary: profile.long_business_summary.unwrap_or_default(),
            sector: profile.sector.unwrap_or_default(),
            industry: profile.industry.unwrap_or_default(),
            website: profile.website.unwrap_or_default(),
        })
    }

    /// The business summary split into sentences on ". ".
    pub fn summary_sentences(&self) -> Vec<String> {
        self.summary
            .split(". ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.ends_with('.') {
                    s.to_string()
                } else {
                    format!("{}.", s)
                }
            })
            .collect()
    }
}

fn require(field: &Option<RawValue>, name: &'static str) -> Result<f64, FetchError> {
    raw_value(field)
        .filter(|v| v.is_finite())
        .map(round2)
        .ok_or(FetchError::MissingField(name))
}

fn either(
    primary: &Option<RawValue>,
    fallback: &Option<RawValue>,
    name: &'static str,
) -> Result<f64, FetchError> {
    require(primary, name).or_else(|_| require(fallback, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use b3stocks_api::types::{AssetProfile, PriceModule, SummaryDetail};

    fn raw(v: f64) -> Option<RawValue> {
        Some(RawValue {
            raw: Some(v),
            fmt: None,
        })
    }

    fn sample() -> QuoteSummaryResult {
        QuoteSummaryResult {
            price: Some(PriceModule {
                long_name: Some("Vale S.A.".to_string()),
                regular_market_price: raw(61.555),
                regular_market_previous_close: raw(60.0),
                regular_market_open: raw(60.5),
                regular_market_day_high: raw(62.0),
                regular_market_day_low: raw(60.1),
                ..Default::default()
            }),
            summary_detail: Some(SummaryDetail {
                previous_close: raw(61.0),
                ..Default::default()
            }),
            asset_profile: Some(AssetProfile {
                long_business_summary: Some("Vale mines iron ore. It also produces nickel".to_string()),
                sector: Some("Basic Materials".to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn summary_detail_preferred_over_price() {
        let snap = QuoteSnapshot::from_summary("VALE3.SA", &sample()).unwrap();
        assert_eq!(snap.previous_close, 61.0);
        assert_eq!(snap.open, 60.5);
        assert_eq!(snap.last_price, 61.56);
    }

    #[test]
    fn pct_uses_rounded_values() {
        let snap = QuoteSnapshot::from_summary("VALE3.SA", &sample()).unwrap();
        let expected = (61.56 / 61.0 - 1.0) * 100.0;
        assert!((snap.pct_today - expected).abs() < 1e-12);
    }

    #[test]
    fn missing_price_module() {
        let err = QuoteSnapshot::from_summary("X", &QuoteSummaryResult::default()).unwrap_err();
        assert_eq!(err, FetchError::MissingField("price"));
    }

    #[test]
    fn missing_last_price() {
        let mut result = sample();
        result.price.as_mut().unwrap().regular_market_price = Some(RawValue::default());
        let err = QuoteSnapshot::from_summary("X", &result).unwrap_err();
        assert_eq!(err, FetchError::MissingField("regularMarketPrice"));
    }

    #[test]
    fn short_name_fallback_and_empty_profile() {
        let mut result = sample();
        let price = result.price.as_mut().unwrap();
        price.long_name = None;
        price.short_name = Some("VALE ON NM".to_string());
        result.asset_profile = None;
        let snap = QuoteSnapshot::from_summary("VALE3.SA", &result).unwrap();
        assert_eq!(snap.long_name, "VALE ON NM");
        assert_eq!(snap.website, "");
        assert_eq!(snap.industry, "");
    }

    #[test]
    fn sentences() {
        let snap = QuoteSnapshot::from_summary("VALE3.SA", &sample()).unwrap();
        assert_eq!(
            snap.summary_sentences(),
            vec!["Vale mines iron ore.", "It also produces nickel."]
        );
    }
}
