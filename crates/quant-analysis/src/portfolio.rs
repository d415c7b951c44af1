use analysis_core::{AnalysisError, Bar};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::{align_closes, annualized_volatility, correlation_matrix, simple_returns, TRADING_DAYS_PER_YEAR};

/// A position priced at its latest quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub shares: f64,
    pub current_price: f64,
}

/// Per-stock figures. Return and volatility are decimals (0.12 = 12%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDetail {
    pub shares: f64,
    pub current_price: f64,
    pub total_value: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub total_portfolio_value: f64,
    /// Percent
    pub portfolio_expected_return: f64,
    /// Percent
    pub portfolio_volatility: f64,
    /// `None` when the portfolio has no measurable volatility.
    pub sharpe_ratio: Option<f64>,
    pub stock_details: BTreeMap<String, StockDetail>,
    pub individual_stocks: Vec<String>,
    pub correlation_matrix: BTreeMap<String, BTreeMap<String, f64>>,
}

struct Position {
    shares: f64,
    current_price: f64,
}

/// Risk and return of a weighted portfolio from daily price histories.
///
/// Holdings sharing a ticker are merged. Tickers whose history is missing or too short
/// are left out of the risk figures but still count towards the total value.
/// `risk_free_rate` is a decimal.
pub fn calculate_portfolio_metrics(
    holdings: &[Holding],
    histories: &HashMap<String, Vec<Bar>>,
    risk_free_rate: f64,
) -> Result<PortfolioMetrics, AnalysisError> {
    if holdings.is_empty() {
        return Err(AnalysisError::InvalidData("Portfolio cannot be empty".to_string()));
    }

    let mut positions: BTreeMap<String, Position> = BTreeMap::new();
    for holding in holdings {
        let ticker = holding.ticker.trim().to_uppercase();
        let position = positions.entry(ticker).or_insert(Position {
            shares: 0.0,
            current_price: holding.current_price,
        });
        position.shares += holding.shares;
        position.current_price = holding.current_price;
    }

    let total_portfolio_value: f64 = positions.values().map(|p| p.shares * p.current_price).sum();
    if !total_portfolio_value.is_finite() || total_portfolio_value <= 0.0 {
        return Err(AnalysisError::InvalidData(
            "Portfolio value must be positive".to_string(),
        ));
    }

    let mut tickers = Vec::new();
    let mut volatilities = Vec::new();
    let mut series: Vec<&[Bar]> = Vec::new();
    for ticker in positions.keys() {
        let Some(bars) = histories.get(ticker).filter(|b| !b.is_empty()) else {
            tracing::warn!("No price history for {}, excluding it from risk metrics", ticker);
            continue;
        };
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        match annualized_volatility(&closes) {
            Ok(vol) => {
                tickers.push(ticker.clone());
                volatilities.push(vol);
                series.push(bars.as_slice());
            }
            Err(e) => {
                tracing::warn!("Skipping {} in risk metrics: {}", ticker, e);
            }
        }
    }

    if tickers.is_empty() {
        return Err(AnalysisError::CalculationError(
            "Unable to calculate metrics for any stocks in the portfolio".to_string(),
        ));
    }

    let aligned = align_closes(&series);
    let returns: Vec<Vec<f64>> = aligned.columns.iter().map(|c| simple_returns(c)).collect();
    if returns.iter().any(|r| r.is_empty()) {
        return Err(AnalysisError::InsufficientData(
            "Price histories have too few common trading days".to_string(),
        ));
    }

    let n = tickers.len();
    let correlation = correlation_matrix(&returns);

    let mut stock_details = BTreeMap::new();
    let mut weights = DVector::zeros(n);
    let mut expected_returns = DVector::zeros(n);
    for (i, ticker) in tickers.iter().enumerate() {
        let Some(position) = positions.get(ticker) else {
            continue;
        };
        let total_value = position.shares * position.current_price;
        let weight = total_value / total_portfolio_value;
        let annual_return = returns[i].iter().sum::<f64>() / returns[i].len() as f64 * TRADING_DAYS_PER_YEAR;

        weights[i] = weight;
        expected_returns[i] = annual_return;
        stock_details.insert(
            ticker.clone(),
            StockDetail {
                shares: position.shares,
                current_price: position.current_price,
                total_value,
                annual_return,
                annual_volatility: volatilities[i],
                weight,
            },
        );
    }

    let sigma = DVector::from_vec(volatilities);
    let covariance: DMatrix<f64> = correlation.component_mul(&(&sigma * sigma.transpose()));

    let expected_return = weights.dot(&expected_returns);
    let variance = (weights.transpose() * &covariance * &weights)[(0, 0)];
    let volatility = variance.max(0.0).sqrt();

    let sharpe_ratio = if volatility > 0.0 {
        Some((expected_return - risk_free_rate) / volatility)
    } else {
        None
    };

    let mut correlation_map = BTreeMap::new();
    for (i, row_ticker) in tickers.iter().enumerate() {
        let row: BTreeMap<String, f64> = tickers
            .iter()
            .enumerate()
            .map(|(j, col_ticker)| (col_ticker.clone(), correlation[(i, j)]))
            .collect();
        correlation_map.insert(row_ticker.clone(), row);
    }

    tracing::debug!(
        "Portfolio metrics over {} stocks and {} common days: return {:.4}, volatility {:.4}",
        n,
        aligned.dates.len(),
        expected_return,
        volatility
    );

    Ok(PortfolioMetrics {
        total_portfolio_value,
        portfolio_expected_return: expected_return * 100.0,
        portfolio_volatility: volatility * 100.0,
        sharpe_ratio,
        stock_details,
        individual_stocks: tickers,
        correlation_matrix: correlation_map,
    })
}
