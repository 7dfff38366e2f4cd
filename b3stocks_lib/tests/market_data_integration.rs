use std::time::Duration;

use b3stocks_lib::b3stocks_api::Client;
use b3stocks_lib::config::{DashboardConfig, RetryConfig};
use b3stocks_lib::statistics::compute_return_matrix;
use b3stocks_lib::{
    ComparisonReport, FetchError, MarketDataClient, Period, StockDashError, StockDashboard,
};
use chrono::NaiveDate;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHART_PETR4: &str = include_str!("../../b3stocks_api/tests/fixtures/chart_petr4.json");
const CHART_EMPTY: &str = include_str!("../../b3stocks_api/tests/fixtures/chart_empty.json");
const CHART_NOT_FOUND: &str =
    include_str!("../../b3stocks_api/tests/fixtures/chart_not_found.json");
const QUOTE_PETR4: &str =
    include_str!("../../b3stocks_api/tests/fixtures/quote_summary_petr4.json");
const QUOTE_PARTIAL: &str =
    include_str!("../../b3stocks_api/tests/fixtures/quote_summary_partial.json");

fn test_config() -> DashboardConfig {
    DashboardConfig {
        retry: RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
        ..DashboardConfig::default()
    }
}

fn client_for(server: &MockServer, config: &DashboardConfig) -> MarketDataClient {
    MarketDataClient::with_client(Client::with_base_url(&server.uri()), config)
}

/// Same bars as the PETR4 fixture, relabelled for another symbol.
fn chart_for(symbol: &str) -> String {
    CHART_PETR4.replace("PETR4.SA", symbol)
}

async fn mount_chart(server: &MockServer, symbol: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/v8/finance/chart/{}", symbol)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn history_is_adjusted_and_placeholder_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/PETR4.SA"))
        .and(query_param("range", "5d"))
        .and(query_param("includeAdjustedClose", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHART_PETR4))
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let table = client
        .load_ticker_history("PETR4.SA", Period::FiveDays)
        .await
        .unwrap();

    assert_eq!(table.len(), 4);
    assert_eq!(table.closes(), vec![35.0, 35.2, 35.05, 35.12]);
    assert_eq!(
        table.first_date(),
        Some(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap())
    );
    assert_eq!(
        table.last_date(),
        Some(NaiveDate::from_ymd_opt(2024, 6, 7).unwrap())
    );
    assert_eq!(table.bars()[0].open, 34.62);
    assert_eq!(table.bars()[0].volume, 38123400.0);
}

#[tokio::test]
async fn history_unadjusted_when_disabled() {
    let server = MockServer::start().await;
    mount_chart(&server, "PETR4.SA", CHART_PETR4.to_string()).await;

    let config = DashboardConfig {
        auto_adjust: false,
        ..test_config()
    };
    let client = client_for(&server, &config);
    let table = client
        .load_ticker_history("PETR4.SA", Period::FiveDays)
        .await
        .unwrap();
    assert_eq!(table.closes(), vec![37.0, 37.2, 37.05, 37.12]);
}

#[tokio::test]
async fn history_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/PETR4.SA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHART_PETR4))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let first = client
        .load_ticker_history("PETR4.SA", Period::OneYear)
        .await
        .unwrap();
    let second = client
        .load_ticker_history("PETR4.SA", Period::OneYear)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn history_cache_keyed_by_period_and_cleared() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/PETR4.SA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHART_PETR4))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    client.load_ticker_history("PETR4.SA", Period::OneYear).await.unwrap();
    client.load_ticker_history("PETR4.SA", Period::OneMonth).await.unwrap();
    client.clear_cache();
    client.load_ticker_history("PETR4.SA", Period::OneYear).await.unwrap();
}

#[tokio::test]
async fn history_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/PETR4.SA"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_chart(&server, "PETR4.SA", CHART_PETR4.to_string()).await;

    let client = client_for(&server, &test_config());
    let table = client
        .load_ticker_history("PETR4.SA", Period::OneYear)
        .await
        .unwrap();
    assert_eq!(table.len(), 4);
}

#[tokio::test]
async fn history_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/PETR4.SA"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let err = client
        .load_ticker_history("PETR4.SA", Period::OneYear)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 500, .. }));
}

#[tokio::test]
async fn history_timeout_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/PETR4.SA"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(CHART_PETR4)
                .set_delay(Duration::from_millis(500)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let config = test_config();
    let inner = Client::with_base_url(&server.uri()).with_timeout(Duration::from_millis(100));
    let client = MarketDataClient::with_client(inner, &config);
    let err = client
        .load_ticker_history("PETR4.SA", Period::OneYear)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Network(_)));
}

#[tokio::test]
async fn history_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ZZZZ3.SA"))
        .respond_with(ResponseTemplate::new(404).set_body_string(CHART_NOT_FOUND))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let err = client
        .load_ticker_history("ZZZZ3.SA", Period::OneYear)
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::TickerNotFound("ZZZZ3.SA".to_string()));
}

#[tokio::test]
async fn history_malformed_payload_fails_closed() {
    let server = MockServer::start().await;
    let mut chart: serde_json::Value = serde_json::from_str(CHART_PETR4).unwrap();
    chart["chart"]["result"][0]["indicators"]["adjclose"][0]["adjclose"]
        .as_array_mut()
        .unwrap()
        .truncate(2);
    mount_chart(&server, "PETR4.SA", chart.to_string()).await;

    let client = client_for(&server, &test_config());
    let err = client
        .load_ticker_history("PETR4.SA", Period::OneYear)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Malformed(_)));
}

#[tokio::test]
async fn close_prices_keep_full_precision() {
    let server = MockServer::start().await;
    let mut chart: serde_json::Value = serde_json::from_str(CHART_PETR4).unwrap();
    chart["chart"]["result"][0]["indicators"]["adjclose"][0]["adjclose"] =
        serde_json::json!([10.126, 10.134, null, 10.134, 10.14]);
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/PETR4.SA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(chart.to_string()))
        .expect(1)
        .mount(&server)
        .await;
    mount_chart(&server, "VALE3.SA", chart_for("VALE3.SA")).await;

    let client = client_for(&server, &test_config());
    let tickers = vec!["PETR4.SA".to_string(), "VALE3.SA".to_string()];
    let fetched = client
        .load_close_prices(&tickers, Period::OneYear, |_| {})
        .await;

    let closes = fetched.matrix.column("PETR4.SA").unwrap();
    assert_eq!(closes.values(), vec![10.126, 10.134, 10.134, 10.14]);
    let returns = compute_return_matrix(&fetched.matrix);
    let r = returns.column("PETR4.SA").unwrap().values();
    assert!((r[1] - (10.134 / 10.126 - 1.0)).abs() < 1e-12);
    assert!(r[1] > 0.0);

    // the display table shares the cached fetch and is rounded
    let table = client
        .load_ticker_history("PETR4.SA", Period::OneYear)
        .await
        .unwrap();
    assert_eq!(table.closes(), vec![10.13, 10.13, 10.13, 10.14]);
}

// ============================================================================
// Quotes
// ============================================================================

#[tokio::test]
async fn quote_snapshot_mapped_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/PETR4.SA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(QUOTE_PETR4))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let snap = client.load_ticker_info_today("PETR4.SA").await.unwrap();
    assert_eq!(snap.last_price, 37.12);
    assert_eq!(snap.previous_close, 36.99);
    assert_eq!(snap.day_low, 36.9);
    assert_eq!(snap.sector, "Energy");
    assert_eq!(snap.long_name, "Petróleo Brasileiro S.A. - Petrobras");
    assert!((snap.pct_today - (37.12 / 36.99 - 1.0) * 100.0).abs() < 1e-9);
    assert_eq!(snap.summary_sentences().len(), 3);

    let again = client.load_ticker_info_today("PETR4.SA").await.unwrap();
    assert_eq!(snap, again);
}

#[tokio::test]
async fn quote_refetched_once_stale() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/PETR4.SA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(QUOTE_PETR4))
        .expect(2)
        .mount(&server)
        .await;

    let config = DashboardConfig {
        quote_ttl_secs: 0,
        ..test_config()
    };
    let client = client_for(&server, &config);
    client.load_ticker_info_today("PETR4.SA").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    client.load_ticker_info_today("PETR4.SA").await.unwrap();
}

#[tokio::test]
async fn quote_falls_back_to_price_module() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/MGLU3.SA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(QUOTE_PARTIAL))
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let snap = client.load_ticker_info_today("MGLU3.SA").await.unwrap();
    assert_eq!(snap.previous_close, 12.0);
    assert_eq!(snap.open, 12.1);
    assert!((snap.pct_today - 2.5).abs() < 1e-9);
    assert_eq!(snap.website, "");
}

#[tokio::test]
async fn quote_missing_field_is_typed_error() {
    let server = MockServer::start().await;
    let body = QUOTE_PARTIAL.replace("\"regularMarketPrice\"", "\"unusedPrice\"");
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/MGLU3.SA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let err = client.load_ticker_info_today("MGLU3.SA").await.unwrap_err();
    assert_eq!(err, FetchError::MissingField("regularMarketPrice"));
}

// ============================================================================
// Dashboards
// ============================================================================

#[tokio::test]
async fn stock_dashboard_survives_quote_failure() {
    let server = MockServer::start().await;
    mount_chart(&server, "PETR4.SA", CHART_PETR4.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/PETR4.SA"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let view = StockDashboard::load(&client, "PETR4.SA", Period::FiveDays).await;
    assert!(view.quote.is_err());
    let stats = view.statistics.unwrap();
    assert_eq!(stats.high, view.history.unwrap().highs().into_iter().fold(f64::MIN, f64::max));
}

#[tokio::test]
async fn comparison_skips_failed_and_empty_tickers() {
    let server = MockServer::start().await;
    mount_chart(&server, "PETR4.SA", CHART_PETR4.to_string()).await;
    mount_chart(&server, "VALE3.SA", chart_for("VALE3.SA")).await;
    mount_chart(&server, "OIBR3.SA", CHART_EMPTY.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ZZZZ3.SA"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let tickers: Vec<String> = ["PETR4.SA", "ZZZZ3.SA", "VALE3.SA", "OIBR3.SA"]
        .iter()
        .map(|t| t.to_string())
        .collect();
    let mut progress = Vec::new();
    let report = ComparisonReport::load(&client, &tickers, Period::OneYear, |t| {
        progress.push(t.to_string())
    })
    .await
    .unwrap();

    assert_eq!(progress, tickers);
    assert_eq!(report.prices.tickers(), vec!["PETR4.SA", "VALE3.SA"]);
    assert_eq!(report.empty, vec!["OIBR3.SA"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].ticker, "ZZZZ3.SA");
    assert!((report.correlation.get("PETR4.SA", "VALE3.SA").unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(
        report.cumulative_ranking[0].value,
        report.cumulative_ranking[1].value
    );
    assert_eq!(report.cumulative_ranking[0].ticker, "PETR4.SA");
}

#[tokio::test]
async fn comparison_with_one_surviving_ticker_is_precondition_error() {
    let server = MockServer::start().await;
    mount_chart(&server, "PETR4.SA", CHART_PETR4.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ZZZZ3.SA"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server, &test_config());
    let tickers = vec!["PETR4.SA".to_string(), "ZZZZ3.SA".to_string()];
    let err = ComparisonReport::load(&client, &tickers, Period::OneYear, |_| {})
        .await
        .unwrap_err();
    match err {
        StockDashError::Precondition(msg) => assert!(msg.contains("ZZZZ3.SA")),
        other => panic!("expected precondition error, got {}", other),
    }
}
