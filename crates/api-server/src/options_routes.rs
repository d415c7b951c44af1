use analysis_core::OptionType;
use axum::{body::Bytes, routing::post, Json, Router};
use options_pricing::{generate_heatmaps, price_pair, HeatmapParams, OptionHeatmaps};
use serde::{Deserialize, Serialize};

use crate::{analysis_error, json_or_default, ApiResponse, AppError, AppState};

/// Black-Scholes inputs; omitted fields use the calculator's defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OptionPriceRequest {
    #[serde(rename = "S")]
    pub spot: f64,
    #[serde(rename = "K")]
    pub strike: f64,
    #[serde(rename = "T")]
    pub time_to_maturity: f64,
    pub r: f64,
    pub sigma: f64,
    pub option_type: Option<String>,
}

impl Default for OptionPriceRequest {
    fn default() -> Self {
        Self {
            spot: 100.0,
            strike: 110.0,
            time_to_maturity: 1.0,
            r: 0.05,
            sigma: 0.2,
            option_type: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OptionPriceResponse {
    pub call: f64,
    pub put: f64,
    /// Price of the requested leg when `option_type` was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

pub fn options_routes() -> Router<AppState> {
    Router::new()
        .route("/api/options/price", post(price_option))
        .route("/api/options/heatmap", post(option_heatmap))
}

async fn price_option(
    body: Bytes,
) -> Result<Json<ApiResponse<OptionPriceResponse>>, AppError> {
    let request: OptionPriceRequest = json_or_default(&body)?;
    let option_type = request
        .option_type
        .as_deref()
        .map(str::parse::<OptionType>)
        .transpose()
        .map_err(analysis_error)?;

    let quote = price_pair(
        request.spot,
        request.strike,
        request.time_to_maturity,
        request.r,
        request.sigma,
    )
    .map_err(analysis_error)?;

    Ok(Json(ApiResponse::success(OptionPriceResponse {
        call: quote.call,
        put: quote.put,
        price: option_type.map(|t| match t {
            OptionType::Call => quote.call,
            OptionType::Put => quote.put,
        }),
    })))
}

async fn option_heatmap(
    body: Bytes,
) -> Result<Json<ApiResponse<OptionHeatmaps>>, AppError> {
    let params: HeatmapParams = json_or_default(&body)?;
    let heatmaps = tokio::task::spawn_blocking(move || generate_heatmaps(&params))
        .await?
        .map_err(analysis_error)?;
    Ok(Json(ApiResponse::success(heatmaps)))
}
