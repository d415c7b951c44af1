use axum::{extract::Query, routing::get, Json, Router};
use serde::Deserialize;

use crate::{tickers, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub prefix: String,
}

pub fn symbol_routes() -> Router<AppState> {
    Router::new()
        .route("/api/symbols/suggest", get(suggest_symbols))
        .route("/api/symbols/crypto", get(crypto_symbols))
}

async fn suggest_symbols(Query(query): Query<SuggestQuery>) -> Json<ApiResponse<Vec<&'static str>>> {
    Json(ApiResponse::success(tickers::suggest(&query.prefix)))
}

async fn crypto_symbols() -> Json<ApiResponse<Vec<&'static str>>> {
    Json(ApiResponse::success(tickers::CRYPTO_SYMBOLS.to_vec()))
}
