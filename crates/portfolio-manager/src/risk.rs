use analysis_core::{MarketDataProvider, TimeFrame};
use chrono::Utc;
use futures_util::future::join_all;
use quant_analysis::{calculate_portfolio_metrics, Holding};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{PortfolioEntry, PortfolioError, PortfolioReport};

/// Prices a set of portfolio entries and computes their risk over a time frame.
#[derive(Clone)]
pub struct PortfolioRiskService {
    provider: Arc<dyn MarketDataProvider>,
}

impl PortfolioRiskService {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    pub async fn analyze(
        &self,
        entries: &[PortfolioEntry],
        time_frame: TimeFrame,
        risk_free_rate: f64,
    ) -> Result<PortfolioReport, PortfolioError> {
        let entries: Vec<PortfolioEntry> = entries.iter().filter_map(PortfolioEntry::normalized).collect();
        if entries.is_empty() {
            return Err(PortfolioError::NoValidEntries);
        }

        let quotes = join_all(entries.iter().map(|e| self.provider.latest_price(&e.stock))).await;
        let mut holdings = Vec::new();
        for (entry, quote) in entries.iter().zip(quotes) {
            match quote {
                Ok(price) => holdings.push(Holding {
                    ticker: entry.stock.clone(),
                    shares: entry.shares,
                    current_price: price,
                }),
                Err(e) => tracing::warn!("Could not price {}: {}", entry.stock, e),
            }
        }
        if holdings.is_empty() {
            return Err(PortfolioError::NoValidEntries);
        }

        let tickers: BTreeSet<String> = holdings.iter().map(|h| h.ticker.clone()).collect();
        let fetched = join_all(
            tickers
                .iter()
                .map(|t| self.provider.daily_bars(t, time_frame)),
        )
        .await;

        let mut histories = HashMap::new();
        for (ticker, bars) in tickers.into_iter().zip(fetched) {
            match bars {
                Ok(bars) => {
                    histories.insert(ticker, bars);
                }
                Err(e) => tracing::warn!("Could not load {} history for {}: {}", time_frame, ticker, e),
            }
        }

        let metrics = calculate_portfolio_metrics(&holdings, &histories, risk_free_rate)?;
        tracing::info!(
            "Portfolio risk over {}: {} stocks, value {:.2}, volatility {:.2}%",
            time_frame,
            metrics.individual_stocks.len(),
            metrics.total_portfolio_value,
            metrics.portfolio_volatility
        );

        Ok(PortfolioReport {
            metrics,
            analysis_period: time_frame.as_str().to_string(),
            last_updated: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }
}
