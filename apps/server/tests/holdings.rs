use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use nport_holdings::testing::{
    ScriptedTransport, SAMPLE_DOCUMENT_URL, SAMPLE_SUBMISSIONS_JSON, SAMPLE_SUBMISSIONS_URL,
    TEST_USER_AGENT,
};
use nport_holdings::HoldingsService;
use nport_server::{api::app_router, config::Config, AppState};
use serde_json::Value;
use tower::ServiceExt;

fn test_config() -> Config {
    let mut config = Config::from_lookup(|_| None).unwrap();
    config.pipeline.user_agent = TEST_USER_AGENT.to_string();
    config.pipeline.backoff_base = Duration::from_millis(1);
    config
}

fn app_from(transport: Arc<ScriptedTransport>, config: &Config) -> axum::Router {
    let service = HoldingsService::with_transport(transport, &config.pipeline).unwrap();
    let state = Arc::new(AppState {
        holdings_service: Arc::new(service),
    });
    app_router(state, config).unwrap()
}

fn app_with(transport: Arc<ScriptedTransport>) -> axum::Router {
    app_from(transport, &test_config())
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    get_json_from(app, uri, [127, 0, 0, 1]).await
}

async fn get_json_from(app: axum::Router, uri: &str, ip: [u8; 4]) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .extension(ConnectInfo(SocketAddr::from((ip, 40000))))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn returns_latest_holdings() {
    let transport = Arc::new(ScriptedTransport::with_sample_filing());
    let (status, json) = get_json(app_with(transport), "/api/holdings/884394").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cik"], "0000884394");
    assert_eq!(json["asOf"], "2025-06-30");
    assert_eq!(json["count"], 3);
    assert_eq!(json["accession"], "0001752724-25-211156");
    assert_eq!(json["fundName"], "SPDR S&P 500 ETF TRUST");

    let holdings = json["holdings"].as_array().unwrap();
    assert_eq!(holdings.len(), 3);
    assert_eq!(holdings[0]["cusip"], "037833100");
    assert_eq!(holdings[0]["name"], "Apple Inc");
    assert_eq!(holdings[0]["valueUsd"], 1900000.0);
    assert!(holdings[0]["percentValue"].is_number());
}

#[tokio::test]
async fn invalid_cik_is_bad_request() {
    let transport = Arc::new(ScriptedTransport::new());
    let (status, json) = get_json(app_with(transport.clone()), "/api/holdings/not-a-cik").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "CIK must be up to 10 digits.");
    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test]
async fn fund_without_nport_is_not_found() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(
        SAMPLE_SUBMISSIONS_URL,
        StatusCode::OK,
        r#"{"name":"Operating Co","filings":{"recent":{"form":["10-K"],"accessionNumber":["0000884394-25-000001"]}}}"#,
    );
    let (status, json) = get_json(app_with(transport), "/api/holdings/884394").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "No public NPORT-P filings found for this CIK.");
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(SAMPLE_SUBMISSIONS_URL, StatusCode::OK, SAMPLE_SUBMISSIONS_JSON);
    transport.respond(SAMPLE_DOCUMENT_URL, StatusCode::BAD_GATEWAY, "");
    let (status, json) = get_json(app_with(transport.clone()), "/api/holdings/884394").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().starts_with("SEC request failed"));
    assert_eq!(transport.call_count(SAMPLE_DOCUMENT_URL), 3);
}

#[tokio::test]
async fn throttling_is_service_unavailable() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(SAMPLE_SUBMISSIONS_URL, StatusCode::TOO_MANY_REQUESTS, "");
    let (status, json) = get_json(app_with(transport), "/api/holdings/884394").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn holdings_quota_is_enforced_per_client() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut config = test_config();
    config.rate_limits.holdings_per_minute = 2;
    let app = app_from(transport, &config);

    for _ in 0..2 {
        let (status, _) = get_json_from(app.clone(), "/api/holdings/not-a-cik", [10, 0, 0, 1]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, json) = get_json_from(app.clone(), "/api/holdings/not-a-cik", [10, 0, 0, 1]).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"], "Rate limit exceeded. Please try again later.");

    let (status, _) = get_json_from(app, "/api/holdings/not-a-cik", [10, 0, 0, 2]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn slow_upstream_is_bad_gateway_with_json_error() {
    let transport = Arc::new(
        ScriptedTransport::with_sample_filing().with_latency(Duration::from_millis(200)),
    );
    let mut config = test_config();
    config.request_timeout = Duration::from_millis(300);
    config.pipeline.lookup_timeout = Duration::from_millis(100);
    let (status, json) = get_json(app_from(transport, &config), "/api/holdings/884394").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        json["error"],
        "SEC request failed: lookup did not finish within 100 ms"
    );
}

#[tokio::test]
async fn request_timeout_answers_with_json_error() {
    let transport = Arc::new(
        ScriptedTransport::with_sample_filing().with_latency(Duration::from_millis(500)),
    );
    let mut config = test_config();
    config.request_timeout = Duration::from_millis(100);
    config.pipeline.lookup_timeout = Duration::from_secs(5);
    let (status, json) = get_json(app_from(transport, &config), "/api/holdings/884394").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(json["error"].is_string());
}
