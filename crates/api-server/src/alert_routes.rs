use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use stock_alerts::{AlertError, AlertInput, AlertRunSummary, PriceAlert};

use crate::request_id::RequestId;
use crate::{alert_error, ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearedAlerts {
    pub deleted: u64,
}

pub fn alert_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/alerts",
            get(list_alerts).post(create_alert).delete(clear_alerts),
        )
        .route("/api/alerts/check", post(check_alerts))
        .route("/api/alerts/:id", get(get_alert).delete(delete_alert))
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<ApiResponse<Vec<PriceAlert>>>, AppError> {
    let alerts = if query.all {
        state.alerts.all_alerts().await
    } else {
        state.alerts.active_alerts().await
    }
    .map_err(alert_error)?;
    Ok(Json(ApiResponse::success(alerts)))
}

async fn create_alert(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<AlertInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PriceAlert>>), AppError> {
    let Json(input) = body.map_err(|rejection| {
        tracing::debug!("Rejected alert body: {}", rejection);
        alert_error(AlertError::invalid_input())
    })?;
    let input = input.validated().map_err(alert_error)?;

    let current_price = state.latest_price(&input.stock_symbol).await.map_err(|e| {
        tracing::warn!("Could not price {} for new alert: {}", input.stock_symbol, e);
        AppError::bad_request(format!(
            "Could not fetch a current price for {}",
            input.stock_symbol
        ))
    })?;

    let alert = state
        .alerts
        .create_alert(&input, current_price)
        .await
        .map_err(alert_error)?;
    tracing::info!(request_id = %request_id.0, "Alert {} created for {}", alert.alert_id, alert.stock_symbol);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(alert))))
}

async fn clear_alerts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ClearedAlerts>>, AppError> {
    let deleted = state.alerts.clear_alerts().await.map_err(alert_error)?;
    tracing::info!("Cleared {} alerts", deleted);
    Ok(Json(ApiResponse::success(ClearedAlerts { deleted })))
}

async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PriceAlert>>, AppError> {
    let alert = state.alerts.get_alert(&id).await.map_err(alert_error)?;
    Ok(Json(ApiResponse::success(alert)))
}

async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    state.alerts.delete_alert(&id).await.map_err(alert_error)?;
    Ok(Json(ApiResponse::success(id)))
}

/// Run one alert evaluation pass now instead of waiting for the background loop.
async fn check_alerts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AlertRunSummary>>, AppError> {
    let summary = state.alert_monitor.process_alerts().await.map_err(alert_error)?;
    Ok(Json(ApiResponse::success(summary)))
}
