use serde::{Deserialize, Serialize};

use super::UpstreamError;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    pub quote_summary: QuoteSummaryEnvelope,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuoteSummaryEnvelope {
    pub result: Option<Vec<QuoteSummaryResult>>,
    pub error: Option<UpstreamError>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResult {
    pub price: Option<PriceModule>,
    pub summary_detail: Option<SummaryDetail>,
    pub asset_profile: Option<AssetProfile>,
}

/// Numeric field as the provider sends it: `{"raw": 38.5, "fmt": "38.50"}`.
/// Unavailable values arrive as `{}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawValue {
    pub raw: Option<f64>,
    pub fmt: Option<String>,
}

/// Extracts the raw number from an optional `{raw, fmt}` field.
pub fn raw_value(field: &Option<RawValue>) -> Option<f64> {
    field.as_ref().and_then(|v| v.raw)
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PriceModule {
    pub symbol: Option<String>,
    pub currency: Option<String>,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub regular_market_price: Option<RawValue>,
    pub regular_market_previous_close: Option<RawValue>,
    pub regular_market_open: Option<RawValue>,
    pub regular_market_day_high: Option<RawValue>,
    pub regular_market_day_low: Option<RawValue>,
    pub regular_market_change_percent: Option<RawValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDetail {
    pub previous_close: Option<RawValue>,
    pub open: Option<RawValue>,
    pub day_high: Option<RawValue>,
    pub day_low: Option<RawValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssetProfile {
    pub long_business_summary: Option<String>,
    pub website: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}
