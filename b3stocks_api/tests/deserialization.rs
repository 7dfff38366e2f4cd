use b3stocks_api::types::{raw_value, ChartResponse, QuoteSummaryResponse};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[test]
fn deserialize_chart_full() {
    let json = load_fixture("chart_petr4.json");
    let resp: ChartResponse = serde_json::from_str(&json).unwrap();
    assert!(resp.chart.error.is_none());

    let result = &resp.chart.result.as_ref().unwrap()[0];
    assert_eq!(result.meta.symbol, "PETR4.SA");
    assert_eq!(result.meta.currency.as_deref(), Some("BRL"));
    assert_eq!(result.meta.gmtoffset, -10800);
    assert_eq!(result.meta.regular_market_price, Some(37.12));
    assert_eq!(result.timestamp.len(), 5);
    assert_eq!(result.timestamp[0], 1717419600);

    let quote = &result.indicators.quote[0];
    assert_eq!(quote.close.len(), 5);
    assert_eq!(quote.close[0], Some(37.0));
    assert_eq!(quote.close[2], None);
    assert_eq!(quote.volume[1], Some(40211100.0));
    assert_eq!(result.indicators.adjclose[0].adjclose[0], Some(35.0));
}

#[test]
fn deserialize_chart_without_bars() {
    let json = load_fixture("chart_empty.json");
    let resp: ChartResponse = serde_json::from_str(&json).unwrap();
    let result = &resp.chart.result.as_ref().unwrap()[0];
    assert!(result.timestamp.is_empty());
    assert!(result.indicators.quote[0].close.is_empty());
}

#[test]
fn deserialize_chart_error_envelope() {
    let json = load_fixture("chart_not_found.json");
    let resp: ChartResponse = serde_json::from_str(&json).unwrap();
    assert!(resp.chart.result.is_none());
    let err = resp.chart.error.unwrap();
    assert!(err.is_not_found());
    assert_eq!(
        err.description.as_deref(),
        Some("No data found, symbol may be delisted")
    );
}

#[test]
fn deserialize_quote_summary_full() {
    let json = load_fixture("quote_summary_petr4.json");
    let resp: QuoteSummaryResponse = serde_json::from_str(&json).unwrap();
    let result = &resp.quote_summary.result.as_ref().unwrap()[0];

    let price = result.price.as_ref().unwrap();
    assert_eq!(raw_value(&price.regular_market_price), Some(37.123));
    assert_eq!(price.long_name.as_deref(), Some("Petróleo Brasileiro S.A. - Petrobras"));

    let detail = result.summary_detail.as_ref().unwrap();
    assert_eq!(raw_value(&detail.previous_close), Some(36.987));
    assert_eq!(raw_value(&detail.day_low), Some(36.904));

    let profile = result.asset_profile.as_ref().unwrap();
    assert_eq!(profile.sector.as_deref(), Some("Energy"));
    assert_eq!(profile.industry.as_deref(), Some("Oil & Gas Integrated"));
    assert_eq!(profile.website.as_deref(), Some("https://petrobras.com.br"));
}

#[test]
fn deserialize_quote_summary_empty_raw_value() {
    let json = load_fixture("quote_summary_partial.json");
    let resp: QuoteSummaryResponse = serde_json::from_str(&json).unwrap();
    let result = &resp.quote_summary.result.as_ref().unwrap()[0];

    let detail = result.summary_detail.as_ref().unwrap();
    assert!(detail.previous_close.is_some());
    assert_eq!(raw_value(&detail.previous_close), None);
    assert!(result.asset_profile.is_none());
}
