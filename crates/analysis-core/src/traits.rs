use async_trait::async_trait;
use crate::{AnalysisError, Bar, TimeFrame};

/// Source of daily stock history and spot prices
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars covering `time_frame`, oldest first.
    async fn daily_bars(&self, symbol: &str, time_frame: TimeFrame) -> Result<Vec<Bar>, AnalysisError>;

    /// Most recent close.
    async fn latest_price(&self, symbol: &str) -> Result<f64, AnalysisError>;
}

/// Source of daily crypto history quoted in USD
#[async_trait]
pub trait CryptoDataProvider: Send + Sync {
    /// Up to `days` + 1 daily bars, oldest first.
    async fn daily_bars(&self, symbol: &str, days: u32) -> Result<Vec<Bar>, AnalysisError>;
}
