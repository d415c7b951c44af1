use analysis_core::{AnalysisError, Bar, MarketDataProvider, TimeFrame};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use crate::ApiTransport;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
    #[serde(default)]
    adjclose: Vec<AdjCloseSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseSeries {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Daily stock history from the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooFinanceClient {
    base_url: String,
    transport: ApiTransport,
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport: ApiTransport::new("Yahoo Finance"),
        }
    }

    async fn fetch_chart(&self, symbol: &str, range: &str) -> Result<ChartResult, AnalysisError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AnalysisError::InvalidData("Stock ticker cannot be empty".to_string()));
        }

        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let body = self
            .transport
            .get_json(
                self.transport
                    .client()
                    .get(&url)
                    .query(&[("range", range), ("interval", "1d"), ("includeAdjustedClose", "true")]),
            )
            .await?;

        parse_chart(&symbol, body)
    }

    /// Get daily bars for a symbol over an arbitrary Yahoo range string ("5d", "1y", ...)
    pub async fn get_daily_bars(&self, symbol: &str, range: &str) -> Result<Vec<Bar>, AnalysisError> {
        let chart = self.fetch_chart(symbol, range).await?;
        let bars = chart_to_bars(&chart);
        tracing::debug!("Fetched {} daily bars for {} ({})", bars.len(), symbol, range);
        Ok(bars)
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn daily_bars(&self, symbol: &str, time_frame: TimeFrame) -> Result<Vec<Bar>, AnalysisError> {
        self.get_daily_bars(symbol, time_frame.as_str()).await
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, AnalysisError> {
        let chart = self.fetch_chart(symbol, "5d").await?;

        let from_meta = chart
            .meta
            .as_ref()
            .and_then(|m| m.regular_market_price)
            .filter(|p| p.is_finite() && *p > 0.0);

        from_meta
            .or_else(|| chart_to_bars(&chart).last().map(|b| b.close))
            .ok_or_else(|| AnalysisError::NotFound(format!("No price data available for {}", symbol)))
    }
}

fn parse_chart(symbol: &str, body: serde_json::Value) -> Result<ChartResult, AnalysisError> {
    let envelope: ChartEnvelope = serde_json::from_value(body)
        .map_err(|e| AnalysisError::ApiError(format!("Unexpected chart payload for {}: {}", symbol, e)))?;

    if let Some(err) = envelope.chart.error {
        let code = err.code.unwrap_or_default();
        let description = err.description.unwrap_or_default();
        return Err(if code.eq_ignore_ascii_case("Not Found") {
            AnalysisError::NotFound(format!("{}: {}", symbol, description))
        } else {
            AnalysisError::ApiError(format!("{} {}: {}", symbol, code, description))
        });
    }

    envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| AnalysisError::NotFound(format!("No data found for {}", symbol)))
}

/// Zip the parallel timestamp/quote arrays into bars, dropping rows without a close.
/// The adjusted close replaces the raw close when Yahoo provides one.
fn chart_to_bars(chart: &ChartResult) -> Vec<Bar> {
    let empty = QuoteSeries::default();
    let quote = chart.indicators.quote.first().unwrap_or(&empty);
    let adjclose = chart.indicators.adjclose.first().map(|a| &a.adjclose);

    let value_at = |series: &Vec<Option<f64>>, i: usize| series.get(i).copied().flatten();

    chart
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let raw_close = value_at(&quote.close, i)?;
            let close = adjclose
                .and_then(|series| value_at(series, i))
                .unwrap_or(raw_close);
            if !close.is_finite() || close <= 0.0 {
                return None;
            }
            Some(Bar {
                timestamp: DateTime::from_timestamp(ts, 0)?,
                open: value_at(&quote.open, i).unwrap_or(raw_close),
                high: value_at(&quote.high, i).unwrap_or(raw_close),
                low: value_at(&quote.low, i).unwrap_or(raw_close),
                close,
                volume: value_at(&quote.volume, i).unwrap_or(0.0),
            })
        })
        .collect()
}
