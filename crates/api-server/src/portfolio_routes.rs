use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use portfolio_manager::{PortfolioEntry, PortfolioReport};
use serde::{Deserialize, Serialize};

use crate::stock_routes::resolve_time_frame;
use crate::{json_or_default, portfolio_error, ApiResponse, AppError, AppState};

#[derive(Debug, Serialize)]
pub struct DraftView {
    pub entries: Vec<PortfolioEntry>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct EntryCount {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntryRequest {
    pub stock: Option<String>,
    pub shares: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PortfolioRiskRequest {
    /// Entries to analyse; the saved draft is used when absent.
    pub entries: Option<Vec<PortfolioEntry>>,
    pub period: Option<String>,
    pub risk_free_rate: Option<f64>,
}

pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/api/portfolio/entries", get(list_entries).post(add_entry))
        .route(
            "/api/portfolio/entries/:index",
            put(update_entry).delete(remove_entry),
        )
        .route("/api/portfolio/risk", post(calculate_risk))
}

async fn list_entries(State(state): State<AppState>) -> Json<ApiResponse<DraftView>> {
    let draft = state.draft.read().await;
    Json(ApiResponse::success(DraftView {
        entries: draft.entries().to_vec(),
        count: draft.len(),
    }))
}

/// Append an entry; an empty body appends a blank row.
async fn add_entry(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<EntryCount>>, AppError> {
    let entry: PortfolioEntry = json_or_default(&body)?;
    let count = state
        .draft
        .write()
        .await
        .add_entry(entry)
        .map_err(portfolio_error)?;
    Ok(Json(ApiResponse::success(EntryCount { count })))
}

async fn update_entry(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(request): Json<UpdateEntryRequest>,
) -> Result<Json<ApiResponse<PortfolioEntry>>, AppError> {
    let mut draft = state.draft.write().await;
    let entry = draft
        .update_entry(index, request.stock, request.shares)
        .map_err(portfolio_error)?
        .clone();
    Ok(Json(ApiResponse::success(entry)))
}

async fn remove_entry(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<ApiResponse<EntryCount>>, AppError> {
    let count = state
        .draft
        .write()
        .await
        .remove_entry(index)
        .map_err(portfolio_error)?;
    Ok(Json(ApiResponse::success(EntryCount { count })))
}

async fn calculate_risk(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<PortfolioReport>>, AppError> {
    let request: PortfolioRiskRequest = json_or_default(&body)?;
    let time_frame = resolve_time_frame(&state, request.period.as_deref())?;
    let risk_free_rate = request.risk_free_rate.unwrap_or(state.config.risk_free_rate);
    if !risk_free_rate.is_finite() {
        return Err(AppError::bad_request("risk_free_rate must be a number"));
    }

    let entries = match request.entries {
        Some(entries) => entries,
        None => state.draft.read().await.entries().to_vec(),
    };

    let report = state
        .portfolio_risk
        .analyze(&entries, time_frame, risk_free_rate)
        .await
        .map_err(portfolio_error)?;
    Ok(Json(ApiResponse::success(report)))
}
