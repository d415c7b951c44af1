use analysis_core::{PriceSnapshot, TimeFrame};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{analysis_error, ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockVolatility {
    pub symbol: String,
    pub period: TimeFrame,
    #[serde(flatten)]
    pub snapshot: PriceSnapshot,
}

#[derive(Debug, Serialize)]
pub struct StockPrice {
    pub symbol: String,
    pub price: f64,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stocks/:symbol/volatility", get(get_volatility))
        .route("/api/stocks/:symbol/price", get(get_price))
}

/// Requested time frame, or the shared one when the query omits it.
pub(crate) fn resolve_time_frame(state: &AppState, period: Option<&str>) -> Result<TimeFrame, AppError> {
    match period.map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => raw.parse().map_err(analysis_error),
        None => Ok(state.preferences.time_frame()),
    }
}

async fn get_volatility(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<StockVolatility>>, AppError> {
    let symbol = symbol.trim().to_uppercase();
    let time_frame = resolve_time_frame(&state, query.period.as_deref())?;
    let key = format!("{}:{}", symbol, time_frame);

    let snapshot = state
        .caches
        .volatility
        .get_or_try_insert(&key, || async {
            let bars = state.market.daily_bars(&symbol, time_frame).await?;
            let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
            quant_analysis::price_snapshot(&closes)
        })
        .await
        .map_err(analysis_error)?;

    Ok(Json(ApiResponse::success(StockVolatility {
        symbol,
        period: time_frame,
        snapshot,
    })))
}

async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<StockPrice>>, AppError> {
    let symbol = symbol.trim().to_uppercase();
    let price = state.latest_price(&symbol).await.map_err(analysis_error)?;
    Ok(Json(ApiResponse::success(StockPrice { symbol, price })))
}
