use analysis_core::{AnalysisError, Bar, MarketDataProvider, TimeFrame};
use api_server::config::ServerConfig;
use api_server::crypto_stats::CryptoStatsSource;
use api_server::{build_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use notification_service::NotificationService;
use serde_json::{json, Value};
use std::sync::Arc;
use stock_alerts::AlertDb;
use tower::ServiceExt;

struct FakeMarket;

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn daily_bars(&self, symbol: &str, _time_frame: TimeFrame) -> Result<Vec<Bar>, AnalysisError> {
        if symbol == "NOPE" {
            return Err(AnalysisError::NotFound(format!("No data found for {}", symbol)));
        }
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        Ok((0..30)
            .map(|i| {
                let close = 100.0 + (i % 5) as f64 + i as f64 * 0.5;
                Bar {
                    timestamp: start + Duration::days(i),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect())
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, AnalysisError> {
        match symbol {
            "NOPE" => Err(AnalysisError::NotFound(format!("No price data available for {}", symbol))),
            _ => Ok(150.0),
        }
    }
}

struct BrokenCryptoStats;

#[async_trait]
impl CryptoStatsSource for BrokenCryptoStats {
    async fn fetch(&self, _symbol: &str, _days: u32) -> anyhow::Result<Value> {
        anyhow::bail!("upstream unavailable")
    }

    fn name(&self) -> &str {
        "broken"
    }
}

async fn test_app() -> Router {
    let db = AlertDb::new("sqlite::memory:").await.unwrap();
    let state = AppState::new(
        ServerConfig::default(),
        Arc::new(FakeMarket),
        Arc::new(BrokenCryptoStats),
        db,
        NotificationService::with_channels(vec![]),
    );
    build_router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_echoes_request_id() {
    let app = test_app().await;
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-123")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_crypto_stats_requires_symbol_and_period() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/api/crypto-stats?symbol=BTC", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing symbol or period parameter" }));

    let (status, _) = send(&app, "GET", "/api/crypto-stats?period=1y", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/crypto-stats?symbol=BTC&period=forever", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_crypto_stats_failure_is_500() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/crypto-stats?symbol=BTC&period=365", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to fetch crypto statistics" }));

    let (status, body) = send(&app, "GET", "/api/crypto-stats/market?symbols=BTC,ETH", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["failed"], json!(["BTC", "ETH"]));
}

#[tokio::test]
async fn test_portfolio_entries_add_and_remove_one_at_a_time() {
    let app = test_app().await;

    let (_, body) = send(&app, "GET", "/api/portfolio/entries", None).await;
    assert_eq!(body["data"]["count"], 1);

    let (status, body) = send(&app, "POST", "/api/portfolio/entries", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/portfolio/entries/0",
        Some(json!({ "stock": "aapl", "shares": 10.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], "AAPL");

    let (status, body) = send(&app, "DELETE", "/api/portfolio/entries/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);

    let (status, _) = send(&app, "DELETE", "/api/portfolio/entries/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_portfolio_risk() {
    let app = test_app().await;

    let (status, body) = send(&app, "POST", "/api/portfolio/risk", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please enter at least one valid stock with shares.");

    let (status, body) = send(
        &app,
        "POST",
        "/api/portfolio/risk",
        Some(json!({ "entries": [{ "stock": "MSFT", "shares": 2.0 }, { "stock": "AAPL", "shares": 2.0 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_portfolio_value"], 600.0);
    assert_eq!(body["data"]["individual_stocks"], json!(["AAPL", "MSFT"]));
}

#[tokio::test]
async fn test_time_frame_preference_drives_default_period() {
    let app = test_app().await;

    let (_, body) = send(&app, "GET", "/api/preferences/time-frame", None).await;
    assert_eq!(body["data"]["time_frame"], "1y");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/preferences/time-frame",
        Some(json!({ "time_frame": "5y" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/preferences", None).await;
    assert_eq!(body["data"]["time_frame"], "5y");

    let (status, body) = send(&app, "GET", "/api/stocks/aapl/volatility", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["symbol"], "AAPL");
    assert_eq!(body["data"]["period"], "5y");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/preferences/time-frame",
        Some(json!({ "time_frame": "2w" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_stock_is_404() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/stocks/NOPE/price", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_symbol_suggestions() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/symbols/suggest?prefix=g", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(["GOOGL", "GE", "GS"]));

    let (_, body) = send(&app, "GET", "/api/symbols/suggest?prefix=", None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_option_price_and_heatmap() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/options/price",
        Some(json!({ "S": 100.0, "K": 100.0, "T": 1.0, "r": 0.05, "sigma": 0.2, "option_type": "put" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let call = body["data"]["call"].as_f64().unwrap();
    let put = body["data"]["put"].as_f64().unwrap();
    assert!((call - 10.4506).abs() < 1e-3);
    assert!((put - 5.5735).abs() < 1e-3);
    assert_eq!(body["data"]["price"], body["data"]["put"]);

    let (status, _) = send(&app, "POST", "/api/options/price", Some(json!({ "sigma": 0.0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/api/options/heatmap", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let calls = body["data"]["call_prices"].as_array().unwrap();
    assert_eq!(calls.len(), 10);
    assert!(calls.iter().all(|row| row.as_array().unwrap().len() == 10));
}

#[tokio::test]
async fn test_mistyped_json_bodies_are_rejected() {
    let app = test_app().await;

    let (status, body) = send(&app, "POST", "/api/options/price", Some(json!({ "S": "abc", "K": 100 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));

    let (status, _) = send(&app, "POST", "/api/options/heatmap", Some(json!({ "strike": "90" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/portfolio/entries",
        Some(json!({ "stock": "AAPL", "shares": "ten" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = send(&app, "GET", "/api/portfolio/entries", None).await;
    assert_eq!(body["data"]["count"], 1);

    let (status, _) = send(&app, "POST", "/api/portfolio/risk", Some(json!({ "entries": "AAPL" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/api/options/price")
        .header("content-type", "application/json")
        .body(Body::from("{\"S\": 100,"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_bodies_use_defaults() {
    let app = test_app().await;

    let (status, body) = send(&app, "POST", "/api/options/price", None).await;
    assert_eq!(status, StatusCode::OK);
    let call = body["data"]["call"].as_f64().unwrap();
    assert!(call > 0.0 && call < 10.4506);
    assert!(body["data"].get("price").is_none());

    let (status, body) = send(&app, "POST", "/api/options/heatmap", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["call_prices"].as_array().unwrap().len(), 10);

    let (status, body) = send(&app, "POST", "/api/portfolio/entries", Some(json!({ "stock": "msft" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);
}

#[tokio::test]
async fn test_cors_headers_on_every_response() {
    let app = test_app().await;
    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert!(response.headers().contains_key("x-request-id"));

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/options/price")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(preflight).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .contains("POST"));
}

#[tokio::test]
async fn test_alert_lifecycle() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/alerts",
        Some(json!({
            "email": "not-an-email",
            "stock_symbol": "AAPL",
            "price_point": 140.0,
            "comparison_mode": "above"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input data.");

    let (status, _) = send(&app, "POST", "/api/alerts", Some(json!({ "email": "a@b.co" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/alerts",
        Some(json!({
            "email": "investor@example.com",
            "stock_symbol": "aapl",
            "price_point": 140.0,
            "comparison_mode": "above"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["stock_symbol"], "AAPL");
    assert_eq!(body["data"]["alert_status"], "active");
    let alert_id = body["data"]["alert_id"].as_str().unwrap().to_string();

    let (_, body) = send(&app, "GET", "/api/alerts", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "POST", "/api/alerts/check", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["triggered"], 1);
    assert_eq!(body["data"]["triggered_alert_ids"], json!([alert_id.clone()]));

    let (_, body) = send(&app, "GET", "/api/alerts", None).await;
    assert_eq!(body["data"], json!([]));

    let (_, body) = send(&app, "GET", &format!("/api/alerts/{}", alert_id), None).await;
    assert_eq!(body["data"]["alert_status"], "triggered");

    let (status, _) = send(&app, "DELETE", &format!("/api/alerts/{}", alert_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &format!("/api/alerts/{}", alert_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
