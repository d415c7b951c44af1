use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use crate::crypto_stats::period_days;
use crate::{tickers, ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct CryptoStatsQuery {
    pub symbol: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarketStatsQuery {
    pub symbols: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarketStats {
    pub period_days: u32,
    pub stats: BTreeMap<String, serde_json::Value>,
    pub failed: Vec<String>,
}

pub fn crypto_routes() -> Router<AppState> {
    Router::new()
        .route("/api/crypto-stats", get(get_crypto_stats))
        .route("/api/crypto-stats/market", get(get_market_stats))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Statistics for one symbol through the crypto cache, keyed by symbol and day count.
async fn cached_stats(state: &AppState, symbol: &str, days: u32) -> anyhow::Result<serde_json::Value> {
    let key = format!("{}:{}", symbol, days);
    state
        .caches
        .crypto_stats
        .get_or_try_insert(&key, || state.crypto_stats.fetch(symbol, days))
        .await
}

/// Answers with the statistics object itself (or `{error}`), not the API envelope.
async fn get_crypto_stats(
    State(state): State<AppState>,
    Query(query): Query<CryptoStatsQuery>,
) -> Response {
    let (Some(symbol), Some(period)) = (non_blank(query.symbol), non_blank(query.period)) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing symbol or period parameter" })),
        )
            .into_response();
    };

    let days = match period_days(&period) {
        Ok(days) => days,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
        }
    };

    let symbol = symbol.to_uppercase();
    match cached_stats(&state, &symbol, days).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            tracing::error!(
                "Error fetching crypto stats for {} ({} days) via {}: {:#}",
                symbol,
                days,
                state.crypto_stats.name(),
                e
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch crypto statistics" })),
            )
                .into_response()
        }
    }
}

/// Statistics for several symbols at once (defaults to every supported coin).
async fn get_market_stats(
    State(state): State<AppState>,
    Query(query): Query<MarketStatsQuery>,
) -> Result<Json<ApiResponse<MarketStats>>, AppError> {
    let days = match non_blank(query.period) {
        Some(period) => period_days(&period).map_err(crate::analysis_error)?,
        None => state.preferences.time_frame().lookback_days(),
    };

    let symbols: Vec<String> = match non_blank(query.symbols) {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        None => tickers::CRYPTO_SYMBOLS.iter().map(|s| s.to_string()).collect(),
    };

    let results = join_all(symbols.iter().map(|s| cached_stats(&state, s, days))).await;

    let mut stats = BTreeMap::new();
    let mut failed = Vec::new();
    for (symbol, result) in symbols.into_iter().zip(results) {
        match result {
            Ok(value) => {
                stats.insert(symbol, value);
            }
            Err(e) => {
                tracing::warn!("Skipping {} in market stats: {:#}", symbol, e);
                failed.push(symbol);
            }
        }
    }

    Ok(Json(ApiResponse::success(MarketStats {
        period_days: days,
        stats,
        failed,
    })))
}
