use analysis_core::{AnalysisError, Bar, CryptoDataProvider};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use crate::ApiTransport;

const DEFAULT_BASE_URL: &str = "https://min-api.cryptocompare.com";
/// histoday refuses limits above this value.
const MAX_LIMIT: u32 = 2000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistoDayResponse {
    response: String,
    #[serde(default)]
    message: String,
    data: Option<HistoDayData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistoDayData {
    #[serde(default)]
    data: Vec<HistoDayRow>,
}

#[derive(Debug, Deserialize)]
struct HistoDayRow {
    time: i64,
    #[serde(default)]
    open: f64,
    #[serde(default)]
    high: f64,
    #[serde(default)]
    low: f64,
    #[serde(default)]
    close: f64,
    #[serde(default)]
    volumefrom: f64,
}

/// Daily crypto history (USD) from CryptoCompare.
#[derive(Clone)]
pub struct CryptoCompareClient {
    base_url: String,
    api_key: Option<String>,
    transport: ApiTransport,
}

impl CryptoCompareClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            transport: ApiTransport::new("CryptoCompare"),
        }
    }
}

#[async_trait]
impl CryptoDataProvider for CryptoCompareClient {
    async fn daily_bars(&self, symbol: &str, days: u32) -> Result<Vec<Bar>, AnalysisError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AnalysisError::InvalidData("Crypto symbol cannot be empty".to_string()));
        }

        let url = format!("{}/data/v2/histoday", self.base_url);
        let limit = days.clamp(1, MAX_LIMIT).to_string();
        let mut query = vec![
            ("fsym", symbol.clone()),
            ("tsym", "USD".to_string()),
            ("limit", limit),
        ];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        let body = self
            .transport
            .get_json(self.transport.client().get(&url).query(&query))
            .await?;

        let bars = parse_histoday(&symbol, body)?;
        tracing::debug!("Fetched {} daily crypto bars for {} ({} days)", bars.len(), symbol, days);
        Ok(bars)
    }
}

fn parse_histoday(symbol: &str, body: serde_json::Value) -> Result<Vec<Bar>, AnalysisError> {
    let response: HistoDayResponse = serde_json::from_value(body)
        .map_err(|e| AnalysisError::ApiError(format!("Unexpected histoday payload for {}: {}", symbol, e)))?;

    if response.response != "Success" {
        return Err(AnalysisError::ApiError(format!(
            "Error fetching data for {}: {}",
            symbol, response.message
        )));
    }

    let mut bars: Vec<Bar> = response
        .data
        .map(|d| d.data)
        .unwrap_or_default()
        .into_iter()
        // CryptoCompare pads days before listing with zero prices
        .filter(|row| row.close.is_finite() && row.close > 0.0)
        .filter_map(|row| {
            Some(Bar {
                timestamp: DateTime::from_timestamp(row.time, 0)?,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volumefrom,
            })
        })
        .collect();

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}
